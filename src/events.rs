//! Engine events. Every successful mutating call on [`crate::GamePool`]
//! pushes exactly one.

use serde::{Deserialize, Serialize};

use crate::ledger::{Address, Amount};
use crate::round::RoundId;
use crate::settlement::{VoidReason, WinnerSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GamePoolEvent {
    RoundCreated {
        round: RoundId,
        ts: i64,
        opening_time: i64,
        closing_time: i64,
        outcomes: Vec<String>,
    },
    StartRatesDelivered {
        round: RoundId,
        ts: i64,
        rates: Vec<u64>,
    },
    EndRatesDelivered {
        round: RoundId,
        ts: i64,
        rates: Vec<u64>,
    },
    SeedCommitted {
        round: RoundId,
        ts: i64,
        commitment: String,
    },
    ThresholdFinalized {
        round: RoundId,
        ts: i64,
        threshold: u32,
    },
    BetPlaced {
        round: RoundId,
        ts: i64,
        bettor: Address,
        outcome: usize,
        gross: Amount,
        net: Amount,
        fee: Amount,
    },
    RoundClosed {
        round: RoundId,
        ts: i64,
        winners: WinnerSet,
        pool: Amount,
    },
    SettlementVoided {
        round: RoundId,
        ts: i64,
        reason: VoidReason,
    },
    AwardClaimed {
        round: RoundId,
        ts: i64,
        bettor: Address,
        amount: Amount,
    },
    ForfeitSwept {
        round: RoundId,
        ts: i64,
        amount: Amount,
        destination: Option<Address>,
    },
}

impl GamePoolEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GamePoolEvent::RoundCreated { .. } => "round_created",
            GamePoolEvent::StartRatesDelivered { .. } => "start_rates_delivered",
            GamePoolEvent::EndRatesDelivered { .. } => "end_rates_delivered",
            GamePoolEvent::SeedCommitted { .. } => "seed_committed",
            GamePoolEvent::ThresholdFinalized { .. } => "threshold_finalized",
            GamePoolEvent::BetPlaced { .. } => "bet_placed",
            GamePoolEvent::RoundClosed { .. } => "round_closed",
            GamePoolEvent::SettlementVoided { .. } => "settlement_voided",
            GamePoolEvent::AwardClaimed { .. } => "award_claimed",
            GamePoolEvent::ForfeitSwept { .. } => "forfeit_swept",
        }
    }

    pub fn round(&self) -> RoundId {
        match self {
            GamePoolEvent::RoundCreated { round, .. }
            | GamePoolEvent::StartRatesDelivered { round, .. }
            | GamePoolEvent::EndRatesDelivered { round, .. }
            | GamePoolEvent::SeedCommitted { round, .. }
            | GamePoolEvent::ThresholdFinalized { round, .. }
            | GamePoolEvent::BetPlaced { round, .. }
            | GamePoolEvent::RoundClosed { round, .. }
            | GamePoolEvent::SettlementVoided { round, .. }
            | GamePoolEvent::AwardClaimed { round, .. }
            | GamePoolEvent::ForfeitSwept { round, .. } => *round,
        }
    }

    pub fn ts(&self) -> i64 {
        match self {
            GamePoolEvent::RoundCreated { ts, .. }
            | GamePoolEvent::StartRatesDelivered { ts, .. }
            | GamePoolEvent::EndRatesDelivered { ts, .. }
            | GamePoolEvent::SeedCommitted { ts, .. }
            | GamePoolEvent::ThresholdFinalized { ts, .. }
            | GamePoolEvent::BetPlaced { ts, .. }
            | GamePoolEvent::RoundClosed { ts, .. }
            | GamePoolEvent::SettlementVoided { ts, .. }
            | GamePoolEvent::AwardClaimed { ts, .. }
            | GamePoolEvent::ForfeitSwept { ts, .. } => *ts,
        }
    }

    pub fn bettor(&self) -> Option<&Address> {
        match self {
            GamePoolEvent::BetPlaced { bettor, .. } | GamePoolEvent::AwardClaimed { bettor, .. } => {
                Some(bettor)
            }
            _ => None,
        }
    }

    /// Value moved, for events that move value.
    pub fn amount(&self) -> Option<Amount> {
        match self {
            GamePoolEvent::BetPlaced { gross, .. } => Some(*gross),
            GamePoolEvent::AwardClaimed { amount, .. } | GamePoolEvent::ForfeitSwept { amount, .. } => {
                Some(*amount)
            }
            GamePoolEvent::RoundClosed { pool, .. } => Some(*pool),
            _ => None,
        }
    }
}
