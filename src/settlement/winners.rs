//! Winner selection policy.
//!
//! The choice of winners is a pure function of the change vector, the
//! significance threshold and the configured boundary rule, kept apart from
//! the engine so every tie and boundary case can be tested in isolation.

use serde::{Deserialize, Serialize};

use crate::config::ThresholdBoundary;

/// Why a settlement attempt found no winners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoidReason {
    /// The winning groups would cover every outcome, leaving nothing to fund them.
    AllOutcomesExtreme,
    /// The winning extreme does not clear the significance threshold.
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnerSet {
    NoWinners(VoidReason),
    /// Outcomes sharing the single winning extreme, ascending.
    SingleGroup(Vec<usize>),
    /// `|max| == |min|`, both non-zero: the positive group, then the negative one.
    TwoGroups(Vec<usize>, Vec<usize>),
}

impl WinnerSet {
    pub fn is_void(&self) -> bool {
        matches!(self, WinnerSet::NoWinners(_))
    }

    pub fn groups(&self) -> Vec<&[usize]> {
        match self {
            WinnerSet::NoWinners(_) => Vec::new(),
            WinnerSet::SingleGroup(g) => vec![g.as_slice()],
            WinnerSet::TwoGroups(a, b) => vec![a.as_slice(), b.as_slice()],
        }
    }

    pub fn outcomes(&self) -> Vec<usize> {
        let mut all: Vec<usize> = self.groups().into_iter().flatten().copied().collect();
        all.sort_unstable();
        all
    }

    pub fn contains(&self, outcome: usize) -> bool {
        self.groups().iter().any(|g| g.contains(&outcome))
    }
}

/// Percent change, truncated toward zero. `start` must be non-zero.
pub fn change_pct(start: u64, end: u64) -> i128 {
    (end as i128 - start as i128) * 100 / start as i128
}

pub fn change_vector(start: &[u64], end: &[u64]) -> Vec<i128> {
    start
        .iter()
        .zip(end)
        .map(|(s, e)| change_pct(*s, *e))
        .collect()
}

fn indices_of(changes: &[i128], value: i128) -> Vec<usize> {
    changes
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == value)
        .map(|(i, _)| i)
        .collect()
}

/// Select the winning outcome group(s).
///
/// The larger-magnitude extreme wins, with the positive side taking an equal
/// magnitude unless both sides are non-zero and opposite, in which case both
/// groups win. The result is void when the winning magnitude does not clear
/// `threshold` under `boundary`, or when the winners would be every outcome.
pub fn select_winners(changes: &[i128], threshold: u32, boundary: ThresholdBoundary) -> WinnerSet {
    let (Some(&max_pos), Some(&max_neg)) = (changes.iter().max(), changes.iter().min()) else {
        return WinnerSet::NoWinners(VoidReason::AllOutcomesExtreme);
    };

    let pos_mag = max_pos.unsigned_abs();
    let neg_mag = max_neg.unsigned_abs();

    let magnitude = pos_mag.max(neg_mag);
    if !boundary.clears(magnitude, threshold) {
        return WinnerSet::NoWinners(VoidReason::BelowThreshold);
    }

    let winners = if pos_mag == neg_mag && pos_mag != 0 && max_pos != max_neg {
        WinnerSet::TwoGroups(indices_of(changes, max_pos), indices_of(changes, max_neg))
    } else if pos_mag >= neg_mag {
        WinnerSet::SingleGroup(indices_of(changes, max_pos))
    } else {
        WinnerSet::SingleGroup(indices_of(changes, max_neg))
    };

    if winners.outcomes().len() == changes.len() {
        return WinnerSet::NoWinners(VoidReason::AllOutcomesExtreme);
    }
    winners
}
