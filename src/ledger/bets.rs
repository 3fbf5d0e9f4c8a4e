//! Per-outcome stake aggregates.
//!
//! Append-only: no bet is ever amended or removed. Aggregates are updated only
//! through [`place_bet`], and only while the round is Open.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::{net_stake, Address, Amount, ValueLedger};
use crate::config::{AccountConfig, RebetPolicy};
use crate::error::{EngineError, EngineResult};
use crate::round::{derive_state, Round, RoundId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub bettor: Address,
    pub net_stake: Amount,
    pub placed_at: i64,
}

/// Aggregate for one (round, outcome). Created on the first bet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLedgerEntry {
    pub total_net_stake: Amount,
    pub max_single_net_stake: Amount,
    pub stake_count: u64,
    /// Index into `stakes` of the first entry that reached the maximum.
    pub max_holder: Option<usize>,
    /// Arrival order.
    pub stakes: Vec<StakeEntry>,
}

impl OutcomeLedgerEntry {
    fn record(&mut self, bettor: Address, net: Amount, at: i64) -> EngineResult<usize> {
        let index = self.stakes.len();
        self.total_net_stake = self
            .total_net_stake
            .checked_add(net)
            .ok_or(EngineError::Overflow("outcome total stake"))?;
        // Strictly greater: a later tie does not take over the holder slot
        if self.max_holder.is_none() || net > self.max_single_net_stake {
            self.max_single_net_stake = net;
            self.max_holder = Some(index);
        }
        self.stake_count += 1;
        self.stakes.push(StakeEntry {
            bettor,
            net_stake: net,
            placed_at: at,
        });
        Ok(index)
    }

    pub fn max_holder_stake(&self) -> Option<&StakeEntry> {
        self.max_holder.and_then(|i| self.stakes.get(i))
    }

    /// Number of entries whose stake equals the outcome maximum, holder included.
    pub fn max_stake_ties(&self) -> usize {
        self.stakes
            .iter()
            .filter(|s| s.net_stake == self.max_single_net_stake)
            .count()
    }
}

/// Position of one stake entry inside the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRef {
    pub outcome: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetLedger {
    entries: BTreeMap<usize, OutcomeLedgerEntry>,
    positions: BTreeMap<Address, Vec<StakeRef>>,
}

impl BetLedger {
    pub fn entry(&self, outcome: usize) -> Option<&OutcomeLedgerEntry> {
        self.entries.get(&outcome)
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &OutcomeLedgerEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Net stake over every outcome of the round.
    pub fn total_net_stake(&self) -> Amount {
        self.entries.values().map(|e| e.total_net_stake).sum()
    }

    pub fn stakes_of(&self, bettor: &Address) -> &[StakeRef] {
        self.positions
            .get(bettor)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn stake_at(&self, at: StakeRef) -> Option<&StakeEntry> {
        self.entries.get(&at.outcome)?.stakes.get(at.index)
    }

    pub fn has_bet(&self, bettor: &Address) -> bool {
        self.positions.contains_key(bettor)
    }

    pub fn bettors(&self) -> impl Iterator<Item = &Address> {
        self.positions.keys()
    }

    /// Fails if recording `net` on `outcome` would overflow either total.
    fn check_capacity(&self, outcome: usize, net: Amount) -> EngineResult<()> {
        let outcome_total = self.entries.get(&outcome).map_or(0, |e| e.total_net_stake);
        outcome_total
            .checked_add(net)
            .ok_or(EngineError::Overflow("outcome total stake"))?;
        self.entries
            .values()
            .try_fold(net, |acc, e| acc.checked_add(e.total_net_stake))
            .ok_or(EngineError::Overflow("round total stake"))?;
        Ok(())
    }

    fn record(
        &mut self,
        outcome: usize,
        bettor: &Address,
        net: Amount,
        at: i64,
    ) -> EngineResult<StakeRef> {
        let entry = self.entries.entry(outcome).or_default();
        let index = entry.record(bettor.clone(), net, at)?;
        let stake = StakeRef { outcome, index };
        self.positions.entry(bettor.clone()).or_default().push(stake);
        Ok(stake)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetReceipt {
    pub round: RoundId,
    pub outcome: usize,
    pub bettor: Address,
    pub gross: Amount,
    pub net: Amount,
    pub fee: Amount,
    pub placed_at: i64,
    pub entry_index: usize,
}

/// Record a bet and move the gross stake into pool custody.
///
/// Checks run in order: state, minimum, outcome range, re-bet policy, ledger
/// capacity. Custody is touched only after every check passed, and the ledger
/// only after custody accepted the transfer.
pub fn place_bet<L: ValueLedger + ?Sized>(
    round: &mut Round,
    outcome: usize,
    gross: Amount,
    bettor: &Address,
    now: i64,
    custody: &mut L,
    accounts: &AccountConfig,
    rebet: RebetPolicy,
) -> EngineResult<BetReceipt> {
    let state = derive_state(round, now);
    if !state.accepts_bets() {
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation: "place bet",
        });
    }

    let minimum = round.params.minimum_stake;
    if gross < minimum {
        return Err(EngineError::BelowMinimum {
            amount: gross,
            minimum,
        });
    }

    if outcome >= round.outcome_count() {
        return Err(EngineError::InvalidOutcome {
            round: round.id,
            outcome,
            outcomes: round.outcome_count(),
        });
    }

    if rebet == RebetPolicy::Reject && round.ledger.has_bet(bettor) {
        return Err(EngineError::AlreadyBet {
            round: round.id,
            bettor: bettor.clone(),
        });
    }

    let net = net_stake(gross, round.params.fee_permille)?;
    let fee = gross - net;
    round.ledger.check_capacity(outcome, net)?;

    custody.transfer(bettor, &accounts.pool_account, gross)?;
    if fee > 0 {
        custody.transfer(&accounts.pool_account, &accounts.fee_collector, fee)?;
    }

    let stake = round.ledger.record(outcome, bettor, net, now)?;

    info!(
        round = round.id,
        outcome,
        bettor = %bettor,
        gross = %gross,
        net = %net,
        "Bet placed"
    );

    Ok(BetReceipt {
        round: round.id,
        outcome,
        bettor: bettor.clone(),
        gross,
        net,
        fee,
        placed_at: now,
        entry_index: stake.index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoundDefaults;
    use crate::ledger::PaperValueLedger;
    use crate::round::{RoundParams, RoundState};

    const FINNEY: Amount = 1_000_000_000_000_000;
    const MICROETHER: Amount = 1_000_000_000_000;
    const OPENING: i64 = 1_000;

    struct Fixture {
        round: Round,
        custody: PaperValueLedger,
        accounts: AccountConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let outcomes = ["BTC", "LTC", "BCC", "ETH", "ETC"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let params = RoundParams::from_defaults(
                &RoundDefaults::default(),
                OPENING,
                600,
                outcomes,
                vec![10],
            );
            let mut round = Round::new(0, params);
            round.start_rates = vec![100, 200, 300, 400, 500];

            let mut custody = PaperValueLedger::new();
            for name in ["a1", "a2", "a3", "a4"] {
                custody.credit(&Address::new(name), 1_000 * FINNEY).unwrap();
            }
            Self {
                round,
                custody,
                accounts: AccountConfig::default(),
            }
        }

        fn bet(&mut self, bettor: &str, outcome: usize, gross: Amount) -> EngineResult<BetReceipt> {
            self.bet_with(bettor, outcome, gross, RebetPolicy::Reject)
        }

        fn bet_with(
            &mut self,
            bettor: &str,
            outcome: usize,
            gross: Amount,
            rebet: RebetPolicy,
        ) -> EngineResult<BetReceipt> {
            place_bet(
                &mut self.round,
                outcome,
                gross,
                &Address::new(bettor),
                OPENING + 10,
                &mut self.custody,
                &self.accounts,
                rebet,
            )
        }
    }

    #[test]
    fn test_take_bets_aggregates() {
        let mut fx = Fixture::new();
        let net0 = 9_950 * MICROETHER;
        let net1 = 99_500 * MICROETHER;

        fx.bet("a1", 0, 10 * FINNEY).unwrap();
        let e = fx.round.ledger.entry(0).unwrap();
        assert_eq!(
            (e.total_net_stake, e.max_single_net_stake, e.stake_count),
            (net0, net0, 1)
        );

        // Same size: max unchanged, holder stays the first bettor
        fx.bet("a2", 0, 10 * FINNEY).unwrap();
        let e = fx.round.ledger.entry(0).unwrap();
        assert_eq!(
            (e.total_net_stake, e.max_single_net_stake, e.stake_count),
            (2 * net0, net0, 2)
        );
        assert_eq!(e.max_holder_stake().unwrap().bettor, Address::new("a1"));
        assert_eq!(e.max_stake_ties(), 2);

        fx.bet("a3", 0, 100 * FINNEY).unwrap();
        let e = fx.round.ledger.entry(0).unwrap();
        assert_eq!(
            (e.total_net_stake, e.max_single_net_stake, e.stake_count),
            (net1 + 2 * net0, net1, 3)
        );
        assert_eq!(e.max_holder, Some(2));

        fx.bet("a4", 1, 100 * FINNEY).unwrap();
        let e = fx.round.ledger.entry(1).unwrap();
        assert_eq!(
            (e.total_net_stake, e.max_single_net_stake, e.stake_count),
            (net1, net1, 1)
        );
        assert!(fx.round.ledger.entry(2).is_none());
    }

    #[test]
    fn test_custody_and_fee_movement() {
        let mut fx = Fixture::new();
        let receipt = fx.bet("a1", 3, 10 * FINNEY).unwrap();
        assert_eq!(receipt.net, 9_950 * MICROETHER);
        assert_eq!(receipt.fee, 50 * MICROETHER);

        let accounts = fx.accounts.clone();
        assert_eq!(fx.custody.balance(&accounts.pool_account), receipt.net);
        assert_eq!(fx.custody.balance(&accounts.fee_collector), receipt.fee);
        assert_eq!(fx.custody.balance(&Address::new("a1")), 990 * FINNEY);
    }

    #[test]
    fn test_rejections_in_order() {
        let mut fx = Fixture::new();

        let err = place_bet(
            &mut fx.round,
            0,
            10 * FINNEY,
            &Address::new("a1"),
            OPENING - 1,
            &mut fx.custody,
            &fx.accounts,
            RebetPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                state: RoundState::Ready,
                ..
            }
        ));

        // Below minimum is reported before a bad outcome index
        assert!(matches!(
            fx.bet("a1", 9, FINNEY),
            Err(EngineError::BelowMinimum { .. })
        ));
        assert!(matches!(
            fx.bet("a1", 5, 10 * FINNEY),
            Err(EngineError::InvalidOutcome { outcome: 5, .. })
        ));
        assert_eq!(fx.round.ledger.total_net_stake(), 0);
        assert_eq!(fx.custody.transfer_count, 0);
    }

    #[test]
    fn test_rebet_policy() {
        let mut fx = Fixture::new();
        fx.bet("a1", 0, 10 * FINNEY).unwrap();
        assert!(matches!(
            fx.bet("a1", 1, 10 * FINNEY),
            Err(EngineError::AlreadyBet { .. })
        ));

        fx.bet_with("a1", 1, 20 * FINNEY, RebetPolicy::AppendEntries)
            .unwrap();
        let stakes = fx.round.ledger.stakes_of(&Address::new("a1"));
        assert_eq!(stakes.len(), 2);
        assert_eq!(stakes[1], StakeRef { outcome: 1, index: 0 });
    }

    #[test]
    fn test_insufficient_funds_leaves_ledger_untouched() {
        let mut fx = Fixture::new();
        let err = fx.bet("nobody", 0, 10 * FINNEY).unwrap_err();
        assert!(matches!(err, EngineError::Ledger(_)));
        assert!(fx.round.ledger.entry(0).is_none());
        assert!(!fx.round.ledger.has_bet(&Address::new("nobody")));
    }

    #[test]
    fn test_overflowing_stake_moves_no_funds() {
        let mut fx = Fixture::new();
        fx.round.ledger.entries.entry(0).or_default().total_net_stake = Amount::MAX - 1;

        assert!(matches!(
            fx.bet("a1", 0, 10 * FINNEY),
            Err(EngineError::Overflow(_))
        ));
        // Another outcome still overflows the round total
        assert!(matches!(
            fx.bet("a1", 1, 10 * FINNEY),
            Err(EngineError::Overflow(_))
        ));
        assert_eq!(fx.custody.transfer_count, 0);
        assert_eq!(fx.custody.balance(&Address::new("a1")), 1_000 * FINNEY);
        assert!(!fx.round.ledger.has_bet(&Address::new("a1")));
    }
}
