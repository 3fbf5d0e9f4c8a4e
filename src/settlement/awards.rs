//! Award calculation.
//!
//! Pure reads over a closed round. Each stake entry is valued on its own and
//! the values are summed per bettor, so a bettor with several entries (append
//! re-bet policy) is paid for each of them.

use serde::{Deserialize, Serialize};

use super::WinnerSet;
use crate::config::SettlementPolicy;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{percent_of, pro_rata, Address, Amount, OutcomeLedgerEntry};
use crate::round::Round;

/// Components of one bettor's award.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardBreakdown {
    /// A tier, paid to the recorded maximum-stake holder.
    pub holder: Amount,
    /// B tier, pro rata by net stake.
    pub proportional: Amount,
    /// Even share of the remainder among every entry tied at the maximum.
    pub leftover: Amount,
}

impl AwardBreakdown {
    pub fn total(&self) -> EngineResult<Amount> {
        self.holder
            .checked_add(self.proportional)
            .and_then(|v| v.checked_add(self.leftover))
            .ok_or(EngineError::Overflow("award total"))
    }

    fn add(&mut self, other: AwardBreakdown) -> EngineResult<()> {
        let sum = |a: Amount, b: Amount| a.checked_add(b).ok_or(EngineError::Overflow("award sum"));
        self.holder = sum(self.holder, other.holder)?;
        self.proportional = sum(self.proportional, other.proportional)?;
        self.leftover = sum(self.leftover, other.leftover)?;
        Ok(())
    }
}

/// Share of the pool assigned to each winning outcome.
pub fn outcome_shares(winners: &WinnerSet, pool: Amount) -> Vec<(usize, Amount)> {
    let groups = winners.groups();
    if groups.is_empty() {
        return Vec::new();
    }
    let group_pool = pool / groups.len() as Amount;
    groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .flat_map(|g| {
            let share = group_pool / g.len() as Amount;
            g.iter().map(move |o| (*o, share))
        })
        .collect()
}

/// Value of stake entry `index` on an outcome whose share of the pool is `share`.
pub fn entry_award(
    entry: &OutcomeLedgerEntry,
    index: usize,
    share: Amount,
    split_a: u8,
    split_b: u8,
    waive_a_tier: bool,
) -> EngineResult<AwardBreakdown> {
    let Some(stake) = entry.stakes.get(index) else {
        return Ok(AwardBreakdown::default());
    };
    let Some(holder_index) = entry.max_holder else {
        return Ok(AwardBreakdown::default());
    };

    let mut award = AwardBreakdown::default();
    let b_amt = percent_of(share, split_b)?;

    let leftover = if waive_a_tier {
        award.proportional = pro_rata(b_amt, stake.net_stake, entry.total_net_stake)?;
        share - b_amt
    } else {
        let a_amt = percent_of(share, split_a)?;
        let holder_net = entry
            .max_holder_stake()
            .map(|s| s.net_stake)
            .unwrap_or_default();
        let others = entry.total_net_stake.saturating_sub(holder_net);

        if index == holder_index {
            award.holder = a_amt;
        } else {
            award.proportional = pro_rata(b_amt, stake.net_stake, others)?;
        }

        // Nobody besides the holder: B has no recipients and joins the leftover
        if others == 0 {
            share - a_amt
        } else {
            share - a_amt - b_amt
        }
    };

    if stake.net_stake == entry.max_single_net_stake {
        let ties = entry.max_stake_ties() as Amount;
        if ties > 0 {
            award.leftover = leftover / ties;
        }
    }
    Ok(award)
}

/// Full breakdown for `bettor` against the round's recorded winners. A round
/// that is not closed has no winners and yields an empty breakdown.
pub fn award_breakdown(
    round: &Round,
    bettor: &Address,
    policy: &SettlementPolicy,
) -> EngineResult<AwardBreakdown> {
    let mut total = AwardBreakdown::default();
    let Some(winners) = round.winners() else {
        return Ok(total);
    };

    let waive_a_tier =
        policy.waive_a_tier_at_zero_threshold && round.threshold().value() == Some(0);
    let shares = outcome_shares(winners, round.ledger().total_net_stake());
    let params = round.params();

    for stake in round.ledger().stakes_of(bettor) {
        let Some((_, share)) = shares.iter().find(|(o, _)| *o == stake.outcome) else {
            continue;
        };
        let Some(entry) = round.ledger().entry(stake.outcome) else {
            continue;
        };
        let award = entry_award(
            entry,
            stake.index,
            *share,
            params.reward_split_a,
            params.reward_split_b,
            waive_a_tier,
        )?;
        total.add(award)?;
    }
    Ok(total)
}

pub fn calculate_award(
    round: &Round,
    bettor: &Address,
    policy: &SettlementPolicy,
) -> EngineResult<Amount> {
    award_breakdown(round, bettor, policy)?.total()
}
