use tracing::info;

use super::{derive_state, Round, RoundId, RoundParams, RoundState};
use crate::error::{EngineError, EngineResult};

/// Owns every round. Ids are dense indices into `rounds`.
#[derive(Debug, Clone, Default)]
pub struct RoundRegistry {
    rounds: Vec<Round>,
}

impl RoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_round(&mut self, params: RoundParams) -> EngineResult<RoundId> {
        params.validate()?;
        let id = self.rounds.len() as RoundId;
        info!(
            round = id,
            opening_time = params.opening_time,
            closing_time = params.closing_time(),
            outcomes = params.outcomes.len(),
            "Round created"
        );
        self.rounds.push(Round::new(id, params));
        Ok(id)
    }

    pub fn count(&self) -> u64 {
        self.rounds.len() as u64
    }

    pub fn get(&self, id: RoundId) -> Option<&Round> {
        self.rounds.get(usize::try_from(id).ok()?)
    }

    pub(crate) fn get_mut(&mut self, id: RoundId) -> Option<&mut Round> {
        self.rounds.get_mut(usize::try_from(id).ok()?)
    }

    /// `NotExist` for ids at or beyond the round count.
    pub fn state(&self, id: RoundId, now: i64) -> RoundState {
        match self.get(id) {
            Some(round) => derive_state(round, now),
            None => RoundState::NotExist,
        }
    }

    /// Mutable round lookup that reports a missing round as `InvalidState`.
    pub(crate) fn require_mut(
        &mut self,
        id: RoundId,
        operation: &'static str,
    ) -> EngineResult<&mut Round> {
        self.get_mut(id).ok_or(EngineError::InvalidState {
            round: id,
            state: RoundState::NotExist,
            operation,
        })
    }

    pub(crate) fn require(&self, id: RoundId, operation: &'static str) -> EngineResult<&Round> {
        self.get(id).ok_or(EngineError::InvalidState {
            round: id,
            state: RoundState::NotExist,
            operation,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Round> {
        self.rounds.iter()
    }
}
