//! Rate delivery gate.
//!
//! The price oracle is external; this is the only path by which its start and
//! end rate vectors reach a round. Shape is checked on write so a malformed
//! vector never becomes stored state.

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::round::{derive_state, RateVector, Round, RoundState};

fn check_shape(round: &Round, rates: &[u64], which: &str) -> EngineResult<()> {
    if rates.len() != round.outcome_count() {
        return Err(EngineError::Inconsistent {
            round: round.id,
            reason: format!(
                "{} rates carry {} entries for {} outcomes",
                which,
                rates.len(),
                round.outcome_count()
            ),
        });
    }
    match RateVector::classify(rates) {
        RateVector::Set => Ok(()),
        RateVector::Unset => Err(EngineError::Inconsistent {
            round: round.id,
            reason: format!("{} rates are all zero", which),
        }),
        RateVector::Partial => Err(EngineError::Inconsistent {
            round: round.id,
            reason: format!("{} rates are partially zero", which),
        }),
    }
}

/// Accepted in `Created`, and no later than `hidden_window` seconds before
/// closing.
pub fn deliver_start_rates(round: &mut Round, rates: &[u64], now: i64) -> EngineResult<()> {
    let state = derive_state(round, now);
    debug!(round = round.id, ?state, "Start rate delivery");
    if state != RoundState::Created {
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation: "deliver start rates",
        });
    }

    let reveal_deadline = round.closing_time() - round.params.hidden_window;
    if now > reveal_deadline {
        // Still Created: the round stays unopened.
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation: "deliver start rates inside the hidden window",
        });
    }

    check_shape(round, rates, "start")?;
    round.start_rates = rates.to_vec();
    round.start_rates_at = Some(now);
    info!(round = round.id, outcomes = rates.len(), "Start rates delivered");
    Ok(())
}

/// Accepted in `Stop`. A re-delivery in `WaitToClose` replaces the previous
/// vector, which is how a round recovers after a void settlement.
pub fn deliver_end_rates(round: &mut Round, rates: &[u64], now: i64) -> EngineResult<()> {
    let state = derive_state(round, now);
    debug!(round = round.id, ?state, "End rate delivery");
    if !matches!(state, RoundState::Stop | RoundState::WaitToClose) {
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation: "deliver end rates",
        });
    }

    check_shape(round, rates, "end")?;
    round.end_rates = rates.to_vec();
    round.end_rates_at = Some(now);
    info!(round = round.id, outcomes = rates.len(), "End rates delivered");
    Ok(())
}
