//! Fairness Threshold Supplier
//!
//! The significance threshold Y is drawn from a distribution fixed when the
//! round is created. A randomness provider commits `sha256(seed)` while bets
//! are still possible and reveals the seed later; the draw is a pure function
//! of the seed and the candidate digest, so anyone can re-derive it and nobody
//! can steer it after the outcome is known.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::round::{derive_state, Round, RoundState};

/// Hex `sha256(seed)`, the value a provider commits.
pub fn seed_commitment(seed: &[u8]) -> String {
    hex::encode(Sha256::digest(seed))
}

fn candidate_digest(candidates: &[u32]) -> String {
    let mut hasher = Sha256::new();
    for c in candidates {
        hasher.update(c.to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Deterministic index draw for a revealed seed.
pub fn draw_index(seed: &[u8], candidate_digest: &str, candidates: usize) -> usize {
    if candidates == 0 {
        return 0;
    }
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(candidate_digest.as_bytes());
    let mut rng = ChaCha20Rng::from_seed(hasher.finalize().into());
    rng.gen_range(0..candidates)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessThreshold {
    candidates: Vec<u32>,
    candidate_digest: String,
    seed_commitment: Option<String>,
    value: Option<u32>,
    candidate_index: Option<usize>,
}

impl FairnessThreshold {
    pub fn register(candidates: Vec<u32>) -> Self {
        let candidate_digest = candidate_digest(&candidates);
        Self {
            candidates,
            candidate_digest,
            seed_commitment: None,
            value: None,
            candidate_index: None,
        }
    }

    pub fn candidates(&self) -> &[u32] {
        &self.candidates
    }

    pub fn candidate_digest(&self) -> &str {
        &self.candidate_digest
    }

    pub fn commitment(&self) -> Option<&str> {
        self.seed_commitment.as_deref()
    }

    /// Y, once finalized.
    pub fn value(&self) -> Option<u32> {
        self.value
    }

    pub fn candidate_index(&self) -> Option<usize> {
        self.candidate_index
    }

    pub fn is_finalized(&self) -> bool {
        self.value.is_some()
    }
}

/// Record the provider's commitment. Only before betting closes.
pub fn commit_seed(round: &mut Round, commitment: &str, now: i64) -> EngineResult<()> {
    let state = derive_state(round, now);
    if !matches!(
        state,
        RoundState::Created | RoundState::Ready | RoundState::Open
    ) {
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation: "commit threshold seed",
        });
    }

    let commitment = commitment.trim().to_lowercase();
    if commitment.len() != 64 || hex::decode(&commitment).is_err() {
        return Err(EngineError::InvalidParams(format!(
            "seed commitment must be 32 hex-encoded bytes, got {:?}",
            commitment
        )));
    }

    let threshold = &mut round.threshold;
    if threshold.seed_commitment.is_some() {
        return Err(EngineError::SeedAlreadyCommitted(round.id));
    }
    threshold.seed_commitment = Some(commitment);
    info!(round = round.id, "Threshold seed committed");
    Ok(())
}

/// Verify the revealed seed and finalize Y. Returns the drawn value.
pub fn reveal_threshold(round: &mut Round, seed: &[u8], now: i64) -> EngineResult<u32> {
    let state = derive_state(round, now);
    if matches!(state, RoundState::Closed | RoundState::Error) {
        return Err(EngineError::InvalidState {
            round: round.id,
            state,
            operation: "reveal threshold",
        });
    }

    let id = round.id;
    let threshold = &mut round.threshold;
    if threshold.is_finalized() {
        return Err(EngineError::ThresholdAlreadyFinalized(id));
    }
    let committed = threshold
        .seed_commitment
        .as_deref()
        .ok_or(EngineError::SeedNotCommitted(id))?;
    if seed_commitment(seed) != committed {
        return Err(EngineError::CommitmentMismatch(id));
    }

    let index = draw_index(seed, &threshold.candidate_digest, threshold.candidates.len());
    let value = *threshold
        .candidates
        .get(index)
        .ok_or_else(|| EngineError::InvalidParams("empty threshold distribution".to_string()))?;

    threshold.candidate_index = Some(index);
    threshold.value = Some(value);
    info!(round = id, threshold = value, index, "Threshold finalized");
    Ok(value)
}
