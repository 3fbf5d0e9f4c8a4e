//! Serialized async front for the engine.
//!
//! One tokio mutex guards the whole pool, so every mutation is one critical
//! section. Events drained after each call are appended to the activity store
//! while the lock is still held, keeping the store in engine order. A failed
//! write never undoes the engine call: the events go back into the pool buffer
//! and are written by the next call or by [`GamePoolService::flush`].

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clock::Clock;
use crate::error::EngineResult;
use crate::ledger::{Address, Amount, BetReceipt, ValueLedger};
use crate::pool::GamePool;
use crate::round::{RoundId, RoundParams, RoundState};
use crate::settlement::{CloseOutcome, SweepReceipt};
use crate::store::GamePoolDb;

pub struct GamePoolService<L: ValueLedger, C: Clock> {
    pool: Arc<Mutex<GamePool<L, C>>>,
    db: Option<Arc<GamePoolDb>>,
}

impl<L: ValueLedger, C: Clock> Clone for GamePoolService<L, C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            db: self.db.clone(),
        }
    }
}

impl<L: ValueLedger, C: Clock> GamePoolService<L, C> {
    pub fn new(pool: GamePool<L, C>, db: Option<Arc<GamePoolDb>>) -> Self {
        Self {
            pool: Arc::new(Mutex::new(pool)),
            db,
        }
    }

    pub fn pool(&self) -> Arc<Mutex<GamePool<L, C>>> {
        self.pool.clone()
    }

    /// Write buffered events, returning how many were stored. On error they
    /// stay buffered.
    pub async fn flush(&self) -> Result<usize> {
        let mut pool = self.pool.lock().await;
        self.persist(&mut pool).await
    }

    async fn persist(&self, pool: &mut GamePool<L, C>) -> Result<usize> {
        let Some(db) = &self.db else {
            pool.drain_events();
            return Ok(0);
        };
        let events = pool.drain_events();
        if events.is_empty() {
            return Ok(0);
        }
        match db.insert_events(&events).await {
            Ok(written) => Ok(written),
            Err(e) => {
                pool.requeue_events(events);
                Err(e)
            }
        }
    }

    /// Run one engine call under the lock and persist whatever it emitted.
    async fn run<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut GamePool<L, C>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut pool = self.pool.lock().await;
        let result = f(&mut pool);
        if let Err(e) = &result {
            warn!(operation, kind = e.kind(), error = %e, "Engine call rejected");
        }
        if let Err(e) = self.persist(&mut pool).await {
            warn!(
                operation,
                pending = pool.pending_events(),
                error = %e,
                "Activity write failed, events kept for retry"
            );
        }
        result
    }

    pub async fn create_round(&self, params: RoundParams) -> EngineResult<RoundId> {
        self.run("create round", |p| p.create_round(params)).await
    }

    pub async fn state(&self, round: RoundId) -> RoundState {
        self.pool.lock().await.state(round)
    }

    pub async fn deliver_start_rates(&self, round: RoundId, rates: Vec<u64>) -> EngineResult<()> {
        self.run("deliver start rates", |p| p.deliver_start_rates(round, &rates))
            .await
    }

    pub async fn deliver_end_rates(&self, round: RoundId, rates: Vec<u64>) -> EngineResult<()> {
        self.run("deliver end rates", |p| p.deliver_end_rates(round, &rates))
            .await
    }

    pub async fn commit_seed(&self, round: RoundId, commitment: &str) -> EngineResult<()> {
        self.run("commit seed", |p| p.commit_seed(round, commitment))
            .await
    }

    pub async fn reveal_threshold(&self, round: RoundId, seed: &[u8]) -> EngineResult<u32> {
        self.run("reveal threshold", |p| p.reveal_threshold(round, seed))
            .await
    }

    pub async fn place_bet(
        &self,
        round: RoundId,
        outcome: usize,
        gross: Amount,
        bettor: &Address,
    ) -> EngineResult<BetReceipt> {
        self.run("place bet", |p| p.place_bet(round, outcome, gross, bettor))
            .await
    }

    pub async fn close(&self, round: RoundId) -> EngineResult<CloseOutcome> {
        self.run("close", |p| p.close(round)).await
    }

    pub async fn calculate_award_amount(
        &self,
        round: RoundId,
        bettor: &Address,
    ) -> EngineResult<Amount> {
        self.pool.lock().await.calculate_award_amount(round, bettor)
    }

    pub async fn claim(&self, round: RoundId, bettor: &Address) -> EngineResult<Amount> {
        self.run("claim", |p| p.claim(round, bettor)).await
    }

    pub async fn sweep_forfeited(&self, round: RoundId) -> EngineResult<SweepReceipt> {
        self.run("sweep forfeited", |p| p.sweep_forfeited(round))
            .await
    }

    /// Engine errors as `anyhow`, for callers that only need a message.
    pub async fn claim_or_err(&self, round: RoundId, bettor: &Address) -> Result<Amount> {
        Ok(self.claim(round, bettor).await?)
    }
}
