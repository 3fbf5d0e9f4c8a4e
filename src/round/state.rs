//! Round lifecycle derivation.
//!
//! State is never stored. It is recomputed from the round's fields and the
//! current time on every call, first match wins.

use serde::{Deserialize, Serialize};

use super::{RateVector, Round};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    NotExist,
    /// No valid rates yet.
    Created,
    /// Start rates set, opening time not reached.
    Ready,
    /// The only state accepting bets.
    Open,
    /// Past closing, end rates missing.
    Stop,
    /// Past closing with end rates; the only state from which `close` runs.
    WaitToClose,
    Closed,
    /// Rate vectors are malformed or written out of order.
    Error,
}

impl RoundState {
    /// Numeric code, stable across releases.
    pub fn code(self) -> u8 {
        match self {
            RoundState::NotExist => 0,
            RoundState::Created => 1,
            RoundState::Ready => 2,
            RoundState::Open => 3,
            RoundState::Stop => 4,
            RoundState::WaitToClose => 5,
            RoundState::Closed => 6,
            RoundState::Error => 7,
        }
    }

    pub fn accepts_bets(self) -> bool {
        matches!(self, RoundState::Open)
    }

    pub fn can_close(self) -> bool {
        matches!(self, RoundState::WaitToClose)
    }
}

/// Derive the state of an existing round at `now`.
///
/// A partially-set vector is reported as `Error`, never read as zero change.
pub fn derive_state(round: &Round, now: i64) -> RoundState {
    if round.closed {
        return RoundState::Closed;
    }

    let start = RateVector::classify(&round.start_rates);
    let end = RateVector::classify(&round.end_rates);
    if start == RateVector::Partial || end == RateVector::Partial {
        return RoundState::Error;
    }

    let start_set = start == RateVector::Set;
    let end_set = end == RateVector::Set;

    if !start_set && end_set {
        return RoundState::Error;
    }
    if !start_set {
        return RoundState::Created;
    }

    let opening = round.opening_time();
    let closing = round.closing_time();
    if now < opening {
        RoundState::Ready
    } else if now <= closing {
        RoundState::Open
    } else if !end_set {
        RoundState::Stop
    } else {
        RoundState::WaitToClose
    }
}
