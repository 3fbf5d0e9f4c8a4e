//! Scenario runner
//!
//! Drives one round end to end on a [`ManualClock`] from a TOML description:
//! create, commit seed, deliver start rates, take bets, deliver end rates,
//! reveal the threshold, close and claim. Used by the `simulate` command and
//! by integration tests.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::events::GamePoolEvent;
use crate::ledger::{Address, Amount, PaperValueLedger};
use crate::pool::GamePool;
use crate::round::{RoundId, RoundState};
use crate::settlement::{change_vector, CloseOutcome};
use crate::threshold::seed_commitment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub round: ScenarioRound,
    /// Provider seed for the threshold draw.
    pub seed: String,
    pub start_rates: Vec<u64>,
    pub end_rates: Vec<u64>,
    #[serde(default)]
    pub bets: Vec<ScenarioBet>,
    /// Engine settings; defaults when absent.
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRound {
    pub opening_time: i64,
    pub duration: i64,
    pub outcomes: Vec<String>,
    pub threshold_candidates: Vec<u32>,
    #[serde(default)]
    pub reward_split_a: Option<u8>,
    #[serde(default)]
    pub reward_split_b: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioBet {
    pub bettor: String,
    pub outcome: usize,
    /// Gross stake in base units.
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub round: RoundId,
    pub threshold: u32,
    pub changes: Vec<i128>,
    pub states: Vec<(String, RoundState)>,
    pub close: CloseOutcome,
    pub rejected_bets: Vec<(String, String)>,
    /// Claimed amount per bettor, zero for bettors without an award.
    pub awards: BTreeMap<Address, Amount>,
    pub total_net_stake: Amount,
    pub fee_balance: Amount,
    pub pool_balance: Amount,
    pub events: Vec<GamePoolEvent>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("parse scenario")
    }
}

pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport> {
    let setup = &scenario.round;
    let clock = ManualClock::new(setup.opening_time.saturating_sub(1));
    let mut pool = GamePool::new(scenario.config.clone(), PaperValueLedger::new(), clock.clone());

    let mut params = pool.default_params(
        setup.opening_time,
        setup.duration,
        setup.outcomes.clone(),
        setup.threshold_candidates.clone(),
    );
    if let Some(a) = setup.reward_split_a {
        params.reward_split_a = a;
    }
    if let Some(b) = setup.reward_split_b {
        params.reward_split_b = b;
    }
    let closing = params.closing_time();

    let mut states = Vec::new();
    let id = pool.create_round(params).context("create round")?;
    states.push(("created".to_string(), pool.state(id)));

    pool.commit_seed(id, &seed_commitment(scenario.seed.as_bytes()))
        .context("commit seed")?;
    pool.deliver_start_rates(id, &scenario.start_rates)
        .context("deliver start rates")?;
    states.push(("start rates".to_string(), pool.state(id)));

    let mut funding: BTreeMap<Address, Amount> = BTreeMap::new();
    for bet in &scenario.bets {
        let total = funding.entry(Address::new(&bet.bettor)).or_default();
        *total = match total.checked_add(bet.amount) {
            Some(sum) => sum,
            None => bail!("stakes of bettor {} overflow", bet.bettor),
        };
    }
    for (bettor, amount) in &funding {
        pool.custody_mut()
            .credit(bettor, *amount)
            .context("fund bettor")?;
    }

    clock.set(setup.opening_time);
    states.push(("opening".to_string(), pool.state(id)));

    let mut rejected_bets = Vec::new();
    for bet in &scenario.bets {
        let bettor = Address::new(&bet.bettor);
        if let Err(e) = pool.place_bet(id, bet.outcome, bet.amount, &bettor) {
            rejected_bets.push((bettor.to_string(), e.to_string()));
        }
    }

    clock.set(closing + 1);
    states.push(("closing".to_string(), pool.state(id)));

    pool.deliver_end_rates(id, &scenario.end_rates)
        .context("deliver end rates")?;
    let threshold = pool
        .reveal_threshold(id, scenario.seed.as_bytes())
        .context("reveal threshold")?;
    states.push(("end rates".to_string(), pool.state(id)));

    let close = pool.close(id).context("close round")?;
    states.push(("close".to_string(), pool.state(id)));

    let mut awards = BTreeMap::new();
    if let CloseOutcome::Settled(_) = &close {
        for bettor in funding.keys() {
            let owed = pool.calculate_award_amount(id, bettor)?;
            let paid = if owed > 0 { pool.claim(id, bettor)? } else { 0 };
            awards.insert(bettor.clone(), paid);
        }
    }

    let changes = change_vector(&scenario.start_rates, &scenario.end_rates);
    let total_net_stake = pool
        .round(id)
        .map(|r| r.ledger().total_net_stake())
        .unwrap_or_default();

    info!(
        scenario = %scenario.name,
        round = id,
        threshold,
        close = ?close,
        "Scenario finished"
    );

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        round: id,
        threshold,
        changes,
        states,
        close,
        rejected_bets,
        awards,
        total_net_stake,
        fee_balance: pool.fee_balance(),
        pool_balance: pool.pool_balance(),
        events: pool.drain_events(),
    })
}
