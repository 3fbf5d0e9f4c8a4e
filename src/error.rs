//! Engine error taxonomy.
//!
//! Every failure is local to one call and one round. The engine never retries,
//! and nothing here leaves global state half-applied.

use crate::ledger::{Address, Amount, LedgerError};
use crate::round::{RoundId, RoundState};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("round {round} is {state:?}, cannot {operation}")]
    InvalidState {
        round: RoundId,
        state: RoundState,
        operation: &'static str,
    },

    #[error("round {round} has {outcomes} outcomes, index {outcome} is out of range")]
    InvalidOutcome {
        round: RoundId,
        outcome: usize,
        outcomes: usize,
    },

    #[error("stake {amount} is below the round minimum {minimum}")]
    BelowMinimum { amount: Amount, minimum: Amount },

    #[error("award for {bettor} in round {round} already claimed")]
    AlreadyClaimed { round: RoundId, bettor: Address },

    #[error("claim window closed at {deadline} (now {now})")]
    Expired { deadline: i64, now: i64 },

    #[error("inconsistent rate vector for round {round}: {reason}")]
    Inconsistent { round: RoundId, reason: String },

    #[error("invalid round parameters: {0}")]
    InvalidParams(String),

    #[error("{bettor} already holds a stake in round {round}")]
    AlreadyBet { round: RoundId, bettor: Address },

    #[error("{bettor} has no award in round {round}")]
    NoAward { round: RoundId, bettor: Address },

    #[error("significance threshold for round {0} is not finalized")]
    ThresholdNotFinalized(RoundId),

    #[error("significance threshold for round {0} is already finalized")]
    ThresholdAlreadyFinalized(RoundId),

    #[error("no randomness seed committed for round {0}")]
    SeedNotCommitted(RoundId),

    #[error("randomness seed for round {0} already committed")]
    SeedAlreadyCommitted(RoundId),

    #[error("revealed seed does not match the commitment for round {0}")]
    CommitmentMismatch(RoundId),

    #[error("forfeited balance of round {0} already swept")]
    AlreadySwept(RoundId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl EngineError {
    /// Short machine-readable kind, used in activity logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidState { .. } => "invalid_state",
            EngineError::InvalidOutcome { .. } => "invalid_outcome",
            EngineError::BelowMinimum { .. } => "below_minimum",
            EngineError::AlreadyClaimed { .. } => "already_claimed",
            EngineError::Expired { .. } => "expired",
            EngineError::Inconsistent { .. } => "inconsistent",
            EngineError::InvalidParams(_) => "invalid_params",
            EngineError::AlreadyBet { .. } => "already_bet",
            EngineError::NoAward { .. } => "no_award",
            EngineError::ThresholdNotFinalized(_) => "threshold_not_finalized",
            EngineError::ThresholdAlreadyFinalized(_) => "threshold_already_finalized",
            EngineError::SeedNotCommitted(_) => "seed_not_committed",
            EngineError::SeedAlreadyCommitted(_) => "seed_already_committed",
            EngineError::CommitmentMismatch(_) => "commitment_mismatch",
            EngineError::AlreadySwept(_) => "already_swept",
            EngineError::Ledger(_) => "ledger",
            EngineError::Overflow(_) => "overflow",
        }
    }
}
