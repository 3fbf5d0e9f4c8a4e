use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::RoundDefaults;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{Amount, PERMILLE};

/// Longest accepted claim window, ten years.
pub const MAX_CLAIM_DEADLINE_SECS: i64 = 315_360_000;

/// Inputs of the round administration surface. Immutable once the round exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundParams {
    pub opening_time: i64,
    /// Seconds; closing time is `opening_time + duration - 1`.
    pub duration: i64,
    /// Seconds before closing during which start rates may no longer be revealed.
    pub hidden_window: i64,
    /// Seconds after close during which awards can be claimed.
    pub claim_deadline: i64,
    /// Outcome symbols, in index order.
    pub outcomes: Vec<String>,
    /// Pre-registered candidates for the significance threshold.
    pub threshold_candidates: Vec<u32>,
    pub reward_split_a: u8,
    pub reward_split_b: u8,
    pub fee_permille: u16,
    pub minimum_stake: Amount,
}

impl RoundParams {
    /// Timing and economics from the configured defaults.
    pub fn from_defaults(
        defaults: &RoundDefaults,
        opening_time: i64,
        duration: i64,
        outcomes: Vec<String>,
        threshold_candidates: Vec<u32>,
    ) -> Self {
        Self {
            opening_time,
            duration,
            hidden_window: defaults.hidden_window_secs,
            claim_deadline: defaults.claim_deadline_secs,
            outcomes,
            threshold_candidates,
            reward_split_a: defaults.reward_split_a,
            reward_split_b: defaults.reward_split_b,
            fee_permille: defaults.origination_fee_permille,
            minimum_stake: defaults.minimum_stake,
        }
    }

    /// Saturates for parameters that `validate` would reject.
    pub fn closing_time(&self) -> i64 {
        self.opening_time
            .saturating_add(self.duration)
            .saturating_sub(1)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: String| Err(EngineError::InvalidParams(msg));

        if self.outcomes.len() < 2 {
            return invalid(format!("need at least 2 outcomes, got {}", self.outcomes.len()));
        }
        let mut seen = HashSet::new();
        for symbol in &self.outcomes {
            if symbol.trim().is_empty() {
                return invalid("empty outcome symbol".to_string());
            }
            if !seen.insert(symbol.as_str()) {
                return invalid(format!("duplicate outcome symbol {}", symbol));
            }
        }
        if self.duration <= 0 {
            return invalid(format!("duration must be positive, got {}", self.duration));
        }
        if self.hidden_window < 0 || self.hidden_window >= self.duration {
            return invalid(format!(
                "hidden window {} must be within duration {}",
                self.hidden_window, self.duration
            ));
        }
        if self.opening_time.checked_add(self.duration).is_none() {
            return invalid(format!(
                "opening time {} plus duration {} overflows",
                self.opening_time, self.duration
            ));
        }
        if self.claim_deadline <= 0 || self.claim_deadline > MAX_CLAIM_DEADLINE_SECS {
            return invalid(format!(
                "claim deadline must be within 1..={} seconds, got {}",
                MAX_CLAIM_DEADLINE_SECS, self.claim_deadline
            ));
        }
        if self
            .closing_time()
            .checked_add(self.claim_deadline)
            .is_none()
        {
            return invalid(format!(
                "claim window past closing time {} overflows",
                self.closing_time()
            ));
        }
        if self.reward_split_a > 100
            || self.reward_split_b > 100
            || self.reward_split_a as u16 + self.reward_split_b as u16 > 100
        {
            return invalid(format!(
                "reward splits A={} B={} exceed 100%",
                self.reward_split_a, self.reward_split_b
            ));
        }
        if self.fee_permille as u128 > PERMILLE {
            return invalid(format!("fee rate {} exceeds 1000 per mille", self.fee_permille));
        }
        if self.minimum_stake == 0 {
            return invalid("minimum stake must be positive".to_string());
        }
        if self.threshold_candidates.is_empty() {
            return invalid("threshold candidate distribution is empty".to_string());
        }
        Ok(())
    }
}
