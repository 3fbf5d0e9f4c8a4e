//! Engine configuration
//!
//! Round defaults, account names and the settlement policy points. Loaded from
//! TOML, every section optional.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ledger::{Address, Amount};

/// 10 finney in wei.
pub const DEFAULT_MINIMUM_STAKE: Amount = 10_000_000_000_000_000;
pub const DEFAULT_HIDDEN_WINDOW_SECS: i64 = 300;
/// 30 days.
pub const DEFAULT_CLAIM_DEADLINE_SECS: i64 = 2_592_000;
pub const DEFAULT_FEE_PERMILLE: u16 = 5;
pub const DEFAULT_REWARD_SPLIT_A: u8 = 10;
pub const DEFAULT_REWARD_SPLIT_B: u8 = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub round: RoundDefaults,

    #[serde(default)]
    pub policy: SettlementPolicy,

    #[serde(default)]
    pub accounts: AccountConfig,
}

impl EngineConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load from `GAMEPOOL_CONFIG_PATH` or `gamepool.toml`, defaults otherwise
    pub fn from_env() -> Self {
        let path =
            std::env::var("GAMEPOOL_CONFIG_PATH").unwrap_or_else(|_| "gamepool.toml".to_string());

        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default engine config ({}): {}", path, e);
            Self::default()
        })
    }
}

/// Values used when a round is created without explicit overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDefaults {
    #[serde(default = "default_minimum_stake")]
    pub minimum_stake: Amount,
    #[serde(default = "default_hidden_window_secs")]
    pub hidden_window_secs: i64,
    #[serde(default = "default_claim_deadline_secs")]
    pub claim_deadline_secs: i64,
    /// Per-mille of the gross stake.
    #[serde(default = "default_fee_permille")]
    pub origination_fee_permille: u16,
    /// Percent of an outcome share paid to the first maximum-stake holder.
    #[serde(default = "default_reward_split_a")]
    pub reward_split_a: u8,
    /// Percent of an outcome share spread over the other bettors.
    #[serde(default = "default_reward_split_b")]
    pub reward_split_b: u8,
}

fn default_minimum_stake() -> Amount {
    DEFAULT_MINIMUM_STAKE
}

fn default_hidden_window_secs() -> i64 {
    DEFAULT_HIDDEN_WINDOW_SECS
}

fn default_claim_deadline_secs() -> i64 {
    DEFAULT_CLAIM_DEADLINE_SECS
}

fn default_fee_permille() -> u16 {
    DEFAULT_FEE_PERMILLE
}

fn default_reward_split_a() -> u8 {
    DEFAULT_REWARD_SPLIT_A
}

fn default_reward_split_b() -> u8 {
    DEFAULT_REWARD_SPLIT_B
}

impl Default for RoundDefaults {
    fn default() -> Self {
        Self {
            minimum_stake: DEFAULT_MINIMUM_STAKE,
            hidden_window_secs: DEFAULT_HIDDEN_WINDOW_SECS,
            claim_deadline_secs: DEFAULT_CLAIM_DEADLINE_SECS,
            origination_fee_permille: DEFAULT_FEE_PERMILLE,
            reward_split_a: DEFAULT_REWARD_SPLIT_A,
            reward_split_b: DEFAULT_REWARD_SPLIT_B,
        }
    }
}

/// Whether an extreme whose magnitude equals the threshold qualifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBoundary {
    /// `|change| >= Y` qualifies.
    #[default]
    Inclusive,
    /// `|change| > Y` qualifies.
    Exclusive,
}

impl ThresholdBoundary {
    pub fn clears(self, magnitude: u128, threshold: u32) -> bool {
        match self {
            ThresholdBoundary::Inclusive => magnitude >= threshold as u128,
            ThresholdBoundary::Exclusive => magnitude > threshold as u128,
        }
    }
}

/// What happens when a bettor who already staked in a round bets again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebetPolicy {
    /// Second bet fails with `AlreadyBet`.
    #[default]
    Reject,
    /// Each bet is its own stake entry; awards are summed per bettor.
    AppendEntries,
}

/// Where the unclaimed balance of a round goes once its claim window closes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForfeitureDestination {
    #[default]
    FeeCollector,
    /// Stays in the pool account, untracked by any round.
    RetainInPool,
    Account(Address),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementPolicy {
    #[serde(default)]
    pub threshold_boundary: ThresholdBoundary,

    #[serde(default)]
    pub rebet_policy: RebetPolicy,

    #[serde(default)]
    pub forfeiture: ForfeitureDestination,

    /// Compatibility mode for rounds with Y = 0: no A tier, B spread over
    /// every bettor on the outcome, leftover = P - B.
    #[serde(default)]
    pub waive_a_tier_at_zero_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Custody account holding every round's net stakes.
    #[serde(default = "default_pool_account")]
    pub pool_account: Address,
    #[serde(default = "default_fee_collector")]
    pub fee_collector: Address,
}

fn default_pool_account() -> Address {
    Address::new("gamepool")
}

fn default_fee_collector() -> Address {
    Address::new("fee-collector")
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            pool_account: default_pool_account(),
            fee_collector: default_fee_collector(),
        }
    }
}
