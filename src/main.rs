//! GamePool CLI
//!
//! Usage:
//!   gamepool simulate scenarios/five_coins.toml
//!   gamepool simulate scenarios/five_coins.toml --db gamepool.db --json
//!   gamepool activity --db gamepool.db --round 0 --limit 20

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamepool::ledger::Amount;
use gamepool::scenario::{run_scenario, Scenario, ScenarioReport};
use gamepool::store::GamePoolDb;
use gamepool::{CloseOutcome, EngineConfig};

/// 1 microether in base units, for display.
const MICROETHER: Amount = 1_000_000_000_000;

#[derive(Parser, Debug)]
#[command(name = "gamepool")]
#[command(about = "Pooled-stake prediction round settlement engine")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one round end to end from a TOML scenario
    Simulate {
        scenario: PathBuf,

        /// Engine config overriding the scenario's own `[config]`
        #[arg(long, env = "GAMEPOOL_CONFIG_PATH")]
        config: Option<PathBuf>,

        /// Append the round's events to this activity database
        #[arg(long)]
        db: Option<String>,

        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// List recorded activity
    Activity {
        #[arg(long)]
        db: String,

        #[arg(long)]
        round: Option<u64>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gamepool=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let args = Args::parse();
    match args.command {
        Command::Simulate {
            scenario,
            config,
            db,
            json,
        } => simulate(scenario, config, db, json).await,
        Command::Activity { db, round, limit } => activity(&db, round, limit).await,
    }
}

async fn simulate(
    path: PathBuf,
    config: Option<PathBuf>,
    db: Option<String>,
    json: bool,
) -> Result<()> {
    let mut scenario = Scenario::load(&path)?;
    if let Some(config) = config {
        scenario.config = EngineConfig::load(&config)
            .with_context(|| format!("load config {}", config.display()))?;
    }

    let report = run_scenario(&scenario)?;

    if let Some(db_path) = db {
        let db = GamePoolDb::new(&db_path)?;
        let written = db.insert_events(&report.events).await?;
        info!(db = %db_path, events = written, "Activity recorded");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn micro(amount: Amount) -> String {
    format!("{}.{:06}", amount / MICROETHER, amount % MICROETHER * 1_000_000 / MICROETHER)
}

fn print_report(report: &ScenarioReport) {
    println!("=== Scenario: {} ===", report.name);
    println!("Round:      {}", report.round);
    println!("Threshold:  {}%", report.threshold);
    println!("Changes:    {:?}", report.changes);
    println!();

    for (label, state) in &report.states {
        println!("  {:<12} {:?}", label, state);
    }
    println!();

    match &report.close {
        CloseOutcome::Settled(winners) => println!("Winners:    {:?}", winners.outcomes()),
        CloseOutcome::Void(reason) => println!("Void:       {:?}", reason),
    }
    for (bettor, reason) in &report.rejected_bets {
        println!("Rejected:   {} ({})", bettor, reason);
    }
    println!();

    println!("Awards (microether):");
    for (bettor, amount) in &report.awards {
        println!("  {:<20} {}", bettor, micro(*amount));
    }
    println!();
    println!("Net pool:   {}", micro(report.total_net_stake));
    println!("Fees:       {}", micro(report.fee_balance));
    println!("Remaining:  {}", micro(report.pool_balance));
}

async fn activity(db_path: &str, round: Option<u64>, limit: usize) -> Result<()> {
    let db = GamePoolDb::new(db_path)?;
    let records = db.list_activity(limit, round).await?;

    println!("=== Activity: {} ({} records) ===", db_path, records.len());
    for rec in records {
        println!(
            "{:>12} round={:<4} {:<22} bettor={:<16} amount={}",
            rec.ts,
            rec.round_id,
            rec.kind,
            rec.bettor.as_deref().unwrap_or("-"),
            rec.amount.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
