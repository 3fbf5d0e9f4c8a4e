//! Engine facade.
//!
//! `GamePool` owns the registry, custody and event buffer and is the single
//! entry point for every operation. Each method takes `&mut self`, so a round
//! is never observed half-mutated; callers needing shared access wrap the
//! pool the way [`crate::service::GamePoolService`] does.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::events::GamePoolEvent;
use crate::ledger::{self, Address, Amount, BetReceipt, PaperValueLedger, ValueLedger};
use crate::oracle;
use crate::round::{Round, RoundId, RoundParams, RoundRegistry, RoundState};
use crate::settlement::{self, AwardBreakdown, CloseOutcome, SweepReceipt};
use crate::threshold;

pub struct GamePool<L: ValueLedger = PaperValueLedger, C: Clock = SystemClock> {
    config: EngineConfig,
    registry: RoundRegistry,
    custody: L,
    clock: C,
    events: Vec<GamePoolEvent>,
}

impl GamePool<PaperValueLedger, SystemClock> {
    pub fn paper(config: EngineConfig) -> Self {
        Self::new(config, PaperValueLedger::new(), SystemClock)
    }
}

impl<L: ValueLedger, C: Clock> GamePool<L, C> {
    pub fn new(config: EngineConfig, custody: L, clock: C) -> Self {
        Self {
            config,
            registry: RoundRegistry::new(),
            custody,
            clock,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn custody(&self) -> &L {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut L {
        &mut self.custody
    }

    pub fn registry(&self) -> &RoundRegistry {
        &self.registry
    }

    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.registry.get(id)
    }

    pub fn round_count(&self) -> u64 {
        self.registry.count()
    }

    pub fn drain_events(&mut self) -> Vec<GamePoolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Put drained events back ahead of anything emitted since.
    pub fn requeue_events(&mut self, mut events: Vec<GamePoolEvent>) {
        events.append(&mut self.events);
        self.events = events;
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Params built from the configured round defaults.
    pub fn default_params(
        &self,
        opening_time: i64,
        duration: i64,
        outcomes: Vec<String>,
        threshold_candidates: Vec<u32>,
    ) -> RoundParams {
        RoundParams::from_defaults(
            &self.config.round,
            opening_time,
            duration,
            outcomes,
            threshold_candidates,
        )
    }

    // -------------------------------------------------------------------------
    // Administration & collaborators
    // -------------------------------------------------------------------------

    pub fn create_round(&mut self, params: RoundParams) -> EngineResult<RoundId> {
        let (opening_time, closing_time) = (params.opening_time, params.closing_time());
        let outcomes = params.outcomes.clone();
        let id = self.registry.create_round(params)?;
        self.events.push(GamePoolEvent::RoundCreated {
            round: id,
            ts: self.clock.now(),
            opening_time,
            closing_time,
            outcomes,
        });
        Ok(id)
    }

    pub fn state(&self, id: RoundId) -> RoundState {
        self.registry.state(id, self.clock.now())
    }

    pub fn deliver_start_rates(&mut self, id: RoundId, rates: &[u64]) -> EngineResult<()> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "deliver start rates")?;
        oracle::deliver_start_rates(round, rates, now)?;
        self.events.push(GamePoolEvent::StartRatesDelivered {
            round: id,
            ts: now,
            rates: rates.to_vec(),
        });
        Ok(())
    }

    pub fn deliver_end_rates(&mut self, id: RoundId, rates: &[u64]) -> EngineResult<()> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "deliver end rates")?;
        oracle::deliver_end_rates(round, rates, now)?;
        self.events.push(GamePoolEvent::EndRatesDelivered {
            round: id,
            ts: now,
            rates: rates.to_vec(),
        });
        Ok(())
    }

    pub fn commit_seed(&mut self, id: RoundId, commitment: &str) -> EngineResult<()> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "commit threshold seed")?;
        threshold::commit_seed(round, commitment, now)?;
        let commitment = round.threshold().commitment().unwrap_or_default().to_string();
        self.events.push(GamePoolEvent::SeedCommitted {
            round: id,
            ts: now,
            commitment,
        });
        Ok(())
    }

    pub fn reveal_threshold(&mut self, id: RoundId, seed: &[u8]) -> EngineResult<u32> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "reveal threshold")?;
        let value = threshold::reveal_threshold(round, seed, now)?;
        self.events.push(GamePoolEvent::ThresholdFinalized {
            round: id,
            ts: now,
            threshold: value,
        });
        Ok(value)
    }

    // -------------------------------------------------------------------------
    // Bets
    // -------------------------------------------------------------------------

    pub fn place_bet(
        &mut self,
        id: RoundId,
        outcome: usize,
        gross: Amount,
        bettor: &Address,
    ) -> EngineResult<BetReceipt> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "place bet")?;
        let receipt = ledger::place_bet(
            round,
            outcome,
            gross,
            bettor,
            now,
            &mut self.custody,
            &self.config.accounts,
            self.config.policy.rebet_policy,
        )?;
        self.events.push(GamePoolEvent::BetPlaced {
            round: id,
            ts: now,
            bettor: bettor.clone(),
            outcome,
            gross: receipt.gross,
            net: receipt.net,
            fee: receipt.fee,
        });
        Ok(receipt)
    }

    // -------------------------------------------------------------------------
    // Settlement
    // -------------------------------------------------------------------------

    pub fn close(&mut self, id: RoundId) -> EngineResult<CloseOutcome> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "close")?;
        let outcome = settlement::close_round(round, now, &self.config.policy)?;
        let event = match &outcome {
            CloseOutcome::Settled(winners) => GamePoolEvent::RoundClosed {
                round: id,
                ts: now,
                winners: winners.clone(),
                pool: round.ledger().total_net_stake(),
            },
            CloseOutcome::Void(reason) => GamePoolEvent::SettlementVoided {
                round: id,
                ts: now,
                reason: *reason,
            },
        };
        self.events.push(event);
        Ok(outcome)
    }

    pub fn calculate_award_amount(&self, id: RoundId, bettor: &Address) -> EngineResult<Amount> {
        let round = self.registry.require(id, "calculate award")?;
        settlement::calculate_award_amount(round, bettor, self.clock.now(), &self.config.policy)
    }

    pub fn award_details(&self, id: RoundId, bettor: &Address) -> EngineResult<AwardBreakdown> {
        let round = self.registry.require(id, "calculate award")?;
        settlement::award_details(round, bettor, self.clock.now(), &self.config.policy)
    }

    pub fn claim(&mut self, id: RoundId, bettor: &Address) -> EngineResult<Amount> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "claim")?;
        let amount = settlement::claim_award(
            round,
            bettor,
            now,
            &mut self.custody,
            &self.config.accounts,
            &self.config.policy,
        )?;
        self.events.push(GamePoolEvent::AwardClaimed {
            round: id,
            ts: now,
            bettor: bettor.clone(),
            amount,
        });
        Ok(amount)
    }

    pub fn sweep_forfeited(&mut self, id: RoundId) -> EngineResult<SweepReceipt> {
        let now = self.clock.now();
        let round = self.registry.require_mut(id, "sweep forfeited awards")?;
        let receipt = settlement::sweep_forfeited(
            round,
            now,
            &mut self.custody,
            &self.config.accounts,
            &self.config.policy,
        )?;
        self.events.push(GamePoolEvent::ForfeitSwept {
            round: id,
            ts: now,
            amount: receipt.amount,
            destination: receipt.destination.clone(),
        });
        Ok(receipt)
    }

    // -------------------------------------------------------------------------
    // Balances
    // -------------------------------------------------------------------------

    pub fn pool_balance(&self) -> Amount {
        self.custody.balance(&self.config.accounts.pool_account)
    }

    pub fn fee_balance(&self) -> Amount {
        self.custody.balance(&self.config.accounts.fee_collector)
    }
}
