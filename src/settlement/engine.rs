use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{award_breakdown, change_vector, select_winners, AwardBreakdown, VoidReason, WinnerSet};
use crate::config::{AccountConfig, ForfeitureDestination, SettlementPolicy};
use crate::error::{EngineError, EngineResult};
use crate::ledger::{Address, Amount, ValueLedger};
use crate::round::{derive_state, Round, RoundState};

// =============================================================================
// Close
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseOutcome {
    /// Round is Closed with these winners.
    Settled(WinnerSet),
    /// No qualifying winners. The round is left as it was.
    Void(VoidReason),
}

/// Settle a round in `WaitToClose`.
///
/// A void result writes nothing, so the round keeps deriving `WaitToClose`
/// and can be retried after the oracle resupplies end rates.
pub fn close_round(
    round: &mut Round,
    now: i64,
    policy: &SettlementPolicy,
) -> EngineResult<CloseOutcome> {
    let state = derive_state(round, now);
    if !state.can_close() {
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation: "close",
        });
    }
    let threshold = round
        .threshold
        .value()
        .ok_or(EngineError::ThresholdNotFinalized(round.id))?;

    let changes = change_vector(&round.start_rates, &round.end_rates);
    let winners = select_winners(&changes, threshold, policy.threshold_boundary);

    if let WinnerSet::NoWinners(reason) = winners {
        warn!(round = round.id, ?reason, threshold, ?changes, "Settlement void");
        return Ok(CloseOutcome::Void(reason));
    }

    info!(
        round = round.id,
        threshold,
        winners = ?winners.outcomes(),
        pool = %round.ledger.total_net_stake(),
        "Round closed"
    );
    round.closed = true;
    round.closed_at = Some(now);
    round.winners = Some(winners.clone());
    Ok(CloseOutcome::Settled(winners))
}

fn require_closed(round: &Round, now: i64, operation: &'static str) -> EngineResult<()> {
    let state = derive_state(round, now);
    if state != RoundState::Closed {
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation,
        });
    }
    Ok(())
}

// =============================================================================
// Awards & claims
// =============================================================================

/// Award owed to `bettor`, independent of claim state. Closed rounds only.
pub fn calculate_award_amount(
    round: &Round,
    bettor: &Address,
    now: i64,
    policy: &SettlementPolicy,
) -> EngineResult<Amount> {
    require_closed(round, now, "calculate award")?;
    award_breakdown(round, bettor, policy)?.total()
}

pub fn award_details(
    round: &Round,
    bettor: &Address,
    now: i64,
    policy: &SettlementPolicy,
) -> EngineResult<AwardBreakdown> {
    require_closed(round, now, "calculate award")?;
    award_breakdown(round, bettor, policy)
}

/// Pay out a bettor's award.
///
/// Checks run in order: closed, already claimed, deadline, non-zero award. The
/// claimed flag is set only after custody accepted the transfer.
pub fn claim_award<L: ValueLedger + ?Sized>(
    round: &mut Round,
    bettor: &Address,
    now: i64,
    custody: &mut L,
    accounts: &AccountConfig,
    policy: &SettlementPolicy,
) -> EngineResult<Amount> {
    require_closed(round, now, "claim")?;

    if round.claimed.contains(bettor) {
        return Err(EngineError::AlreadyClaimed {
            round: round.id,
            bettor: bettor.clone(),
        });
    }

    let deadline = round
        .claim_expires_at()
        .ok_or(EngineError::Overflow("claim deadline"))?;
    if now > deadline {
        return Err(EngineError::Expired { deadline, now });
    }

    let award = award_breakdown(round, bettor, policy)?.total()?;
    if award == 0 {
        return Err(EngineError::NoAward {
            round: round.id,
            bettor: bettor.clone(),
        });
    }

    custody.transfer(&accounts.pool_account, bettor, award)?;
    round.claimed.insert(bettor.clone());
    round.paid_out = round
        .paid_out
        .checked_add(award)
        .ok_or(EngineError::Overflow("paid out"))?;

    info!(round = round.id, bettor = %bettor, amount = %award, "Award claimed");
    Ok(award)
}

// =============================================================================
// Forfeiture
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReceipt {
    pub amount: Amount,
    /// `None` when the balance stays in the pool account.
    pub destination: Option<Address>,
}

/// Move whatever the round still holds to the forfeiture destination. Only
/// once the claim window has closed, and only once.
pub fn sweep_forfeited<L: ValueLedger + ?Sized>(
    round: &mut Round,
    now: i64,
    custody: &mut L,
    accounts: &AccountConfig,
    policy: &SettlementPolicy,
) -> EngineResult<SweepReceipt> {
    require_closed(round, now, "sweep forfeited awards")?;

    if round.swept {
        return Err(EngineError::AlreadySwept(round.id));
    }

    let deadline = round
        .claim_expires_at()
        .ok_or(EngineError::Overflow("claim deadline"))?;
    if now <= deadline {
        return Err(EngineError::InvalidState {
            round: round.id,
            state: RoundState::Closed,
            operation: "sweep forfeited awards before the claim deadline",
        });
    }

    let amount = round.unclaimed_balance();
    let destination = match &policy.forfeiture {
        ForfeitureDestination::FeeCollector => Some(accounts.fee_collector.clone()),
        ForfeitureDestination::Account(addr) => Some(addr.clone()),
        ForfeitureDestination::RetainInPool => None,
    };

    if let Some(to) = &destination {
        if amount > 0 {
            custody.transfer(&accounts.pool_account, to, amount)?;
        }
    }
    round.swept = true;

    info!(
        round = round.id,
        amount = %amount,
        destination = ?destination,
        "Forfeited balance swept"
    );
    Ok(SweepReceipt {
        amount,
        destination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RebetPolicy, RoundDefaults};
    use crate::ledger::{place_bet, PaperValueLedger};
    use crate::round::RoundParams;
    use crate::threshold::{commit_seed, reveal_threshold, seed_commitment};

    const FINNEY: Amount = 1_000_000_000_000_000;
    const OPENING: i64 = 1_000;
    const DURATION: i64 = 600;

    struct Harness {
        round: Round,
        custody: PaperValueLedger,
        accounts: AccountConfig,
        policy: SettlementPolicy,
    }

    impl Harness {
        fn new(threshold: u32) -> Self {
            let outcomes = ["BTC", "LTC", "BCC", "ETH", "ETC"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let params = RoundParams::from_defaults(
                &RoundDefaults::default(),
                OPENING,
                DURATION,
                outcomes,
                vec![threshold],
            );
            let mut round = Round::new(0, params);
            round.start_rates = vec![100, 200, 300, 400, 500];
            commit_seed(&mut round, &seed_commitment(b"seed"), OPENING).unwrap();
            reveal_threshold(&mut round, b"seed", OPENING).unwrap();

            Self {
                round,
                custody: PaperValueLedger::new(),
                accounts: AccountConfig::default(),
                policy: SettlementPolicy::default(),
            }
        }

        fn bet(&mut self, who: &str, outcome: usize, finney: Amount) {
            let bettor = Address::new(who);
            self.custody.credit(&bettor, finney * FINNEY).unwrap();
            place_bet(
                &mut self.round,
                outcome,
                finney * FINNEY,
                &bettor,
                OPENING,
                &mut self.custody,
                &self.accounts,
                RebetPolicy::Reject,
            )
            .unwrap();
        }

        fn after_close(&self) -> i64 {
            OPENING + DURATION
        }

        fn end(&mut self, rates: [u64; 5]) {
            self.round.end_rates = rates.to_vec();
        }

        fn close(&mut self) -> EngineResult<CloseOutcome> {
            let now = self.after_close();
            close_round(&mut self.round, now, &self.policy)
        }

        fn claim(&mut self, who: &str, now: i64) -> EngineResult<Amount> {
            claim_award(
                &mut self.round,
                &Address::new(who),
                now,
                &mut self.custody,
                &self.accounts,
                &self.policy,
            )
        }
    }

    #[test]
    fn test_close_requires_wait_to_close() {
        let mut h = Harness::new(10);
        let err = h.close().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                state: RoundState::Stop,
                ..
            }
        ));
    }

    #[test]
    fn test_close_and_reclose() {
        let mut h = Harness::new(10);
        h.bet("a", 0, 10);
        h.end([200, 220, 300, 360, 600]);
        assert_eq!(
            h.close().unwrap(),
            CloseOutcome::Settled(WinnerSet::SingleGroup(vec![0]))
        );
        assert_eq!(h.round.closed_at(), Some(h.after_close()));

        let again = h.close().unwrap_err();
        assert!(matches!(
            again,
            EngineError::InvalidState {
                state: RoundState::Closed,
                ..
            }
        ));
    }

    #[test]
    fn test_void_close_leaves_round_untouched() {
        let mut h = Harness::new(50);
        h.bet("a", 0, 10);
        h.end([120, 220, 300, 360, 600]);
        assert_eq!(
            h.close().unwrap(),
            CloseOutcome::Void(VoidReason::BelowThreshold)
        );
        assert!(!h.round.is_closed());
        assert!(h.round.winners().is_none());
        assert_eq!(derive_state(&h.round, h.after_close()), RoundState::WaitToClose);
    }

    #[test]
    fn test_close_without_threshold() {
        let outcomes = vec!["A".to_string(), "B".to_string()];
        let params =
            RoundParams::from_defaults(&RoundDefaults::default(), OPENING, DURATION, outcomes, vec![1]);
        let mut round = Round::new(3, params);
        round.start_rates = vec![1, 1];
        round.end_rates = vec![2, 1];
        assert_eq!(
            close_round(&mut round, OPENING + DURATION, &SettlementPolicy::default()),
            Err(EngineError::ThresholdNotFinalized(3))
        );
    }

    #[test]
    fn test_claim_flow() {
        let mut h = Harness::new(10);
        h.bet("winner", 0, 10);
        h.bet("loser", 1, 10);
        h.end([200, 220, 300, 360, 600]);
        h.close().unwrap();

        let now = h.after_close();
        let pool = h.round.ledger().total_net_stake();
        assert_eq!(
            calculate_award_amount(&h.round, &Address::new("winner"), now, &h.policy),
            Ok(pool)
        );

        assert_eq!(h.claim("winner", now), Ok(pool));
        assert_eq!(h.custody.balance(&Address::new("winner")), pool);
        assert!(matches!(
            h.claim("winner", now),
            Err(EngineError::AlreadyClaimed { .. })
        ));
        assert!(matches!(
            h.claim("loser", now),
            Err(EngineError::NoAward { .. })
        ));
        assert_eq!(h.round.unclaimed_balance(), 0);
    }

    #[test]
    fn test_claim_after_deadline() {
        let mut h = Harness::new(10);
        h.bet("winner", 0, 10);
        h.end([200, 220, 300, 360, 600]);
        h.close().unwrap();

        let deadline = h.round.claim_expires_at().unwrap();
        assert!(matches!(
            h.claim("winner", deadline + 1),
            Err(EngineError::Expired { .. })
        ));
        assert!(h.claim("winner", deadline).is_ok());
    }

    #[test]
    fn test_award_on_open_round_is_invalid_state() {
        let h = Harness::new(10);
        let err =
            calculate_award_amount(&h.round, &Address::new("a"), OPENING, &h.policy).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                state: RoundState::Open,
                ..
            }
        ));
    }

    #[test]
    fn test_sweep_after_deadline() {
        let mut h = Harness::new(10);
        h.bet("winner", 0, 10);
        h.bet("other", 1, 10);
        h.end([200, 220, 300, 360, 600]);
        h.close().unwrap();

        let deadline = h.round.claim_expires_at().unwrap();
        let pool = h.round.ledger().total_net_stake();
        let fees_before = h.custody.balance(&h.accounts.fee_collector);

        let early = sweep_forfeited(
            &mut h.round,
            deadline,
            &mut h.custody,
            &h.accounts,
            &h.policy,
        );
        assert!(matches!(early, Err(EngineError::InvalidState { .. })));

        let receipt = sweep_forfeited(
            &mut h.round,
            deadline + 1,
            &mut h.custody,
            &h.accounts,
            &h.policy,
        )
        .unwrap();
        assert_eq!(receipt.amount, pool);
        assert_eq!(receipt.destination, Some(h.accounts.fee_collector.clone()));
        assert_eq!(
            h.custody.balance(&h.accounts.fee_collector),
            fees_before + pool
        );
        assert_eq!(h.custody.balance(&h.accounts.pool_account), 0);

        let twice = sweep_forfeited(
            &mut h.round,
            deadline + 2,
            &mut h.custody,
            &h.accounts,
            &h.policy,
        );
        assert_eq!(twice, Err(EngineError::AlreadySwept(0)));
    }
}
