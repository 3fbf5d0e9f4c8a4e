use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{RoundId, RoundParams};
use crate::ledger::{Address, Amount, BetLedger};
use crate::settlement::WinnerSet;
use crate::threshold::FairnessThreshold;

/// Shape of a stored rate vector. Zero means "not yet set".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateVector {
    /// Every entry is zero.
    Unset,
    /// Every entry is non-zero.
    Set,
    /// Some entries zero, some not. Never a legal stored state.
    Partial,
}

impl RateVector {
    pub fn classify(rates: &[u64]) -> Self {
        let set = rates.iter().filter(|r| **r != 0).count();
        if set == 0 {
            RateVector::Unset
        } else if set == rates.len() {
            RateVector::Set
        } else {
            RateVector::Partial
        }
    }
}

/// One betting epoch.
///
/// Writers are split by component: the oracle gate writes rates, the threshold
/// supplier writes Y, the bet ledger writes stakes, and settlement alone writes
/// `closed`, the winner set and claim bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub(crate) id: RoundId,
    pub(crate) params: RoundParams,

    pub(crate) start_rates: Vec<u64>,
    pub(crate) start_rates_at: Option<i64>,
    pub(crate) end_rates: Vec<u64>,
    pub(crate) end_rates_at: Option<i64>,

    pub(crate) threshold: FairnessThreshold,
    pub(crate) ledger: BetLedger,

    pub(crate) closed: bool,
    pub(crate) closed_at: Option<i64>,
    pub(crate) winners: Option<WinnerSet>,
    pub(crate) claimed: BTreeSet<Address>,
    pub(crate) paid_out: Amount,
    pub(crate) swept: bool,
}

impl Round {
    pub(crate) fn new(id: RoundId, params: RoundParams) -> Self {
        let n = params.outcomes.len();
        let threshold = FairnessThreshold::register(params.threshold_candidates.clone());
        Self {
            id,
            params,
            start_rates: vec![0; n],
            start_rates_at: None,
            end_rates: vec![0; n],
            end_rates_at: None,
            threshold,
            ledger: BetLedger::default(),
            closed: false,
            closed_at: None,
            winners: None,
            claimed: BTreeSet::new(),
            paid_out: 0,
            swept: false,
        }
    }

    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn params(&self) -> &RoundParams {
        &self.params
    }

    pub fn outcomes(&self) -> &[String] {
        &self.params.outcomes
    }

    pub fn outcome_count(&self) -> usize {
        self.params.outcomes.len()
    }

    pub fn opening_time(&self) -> i64 {
        self.params.opening_time
    }

    pub fn closing_time(&self) -> i64 {
        self.params.closing_time()
    }

    pub fn start_rates(&self) -> &[u64] {
        &self.start_rates
    }

    pub fn start_rates_at(&self) -> Option<i64> {
        self.start_rates_at
    }

    pub fn end_rates(&self) -> &[u64] {
        &self.end_rates
    }

    pub fn end_rates_at(&self) -> Option<i64> {
        self.end_rates_at
    }

    pub fn threshold(&self) -> &FairnessThreshold {
        &self.threshold
    }

    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn closed_at(&self) -> Option<i64> {
        self.closed_at
    }

    /// Populated only once the round is Closed.
    pub fn winners(&self) -> Option<&WinnerSet> {
        self.winners.as_ref()
    }

    /// Last instant at which a claim is accepted. `None` until closed, or if
    /// the window runs past the end of time.
    pub fn claim_expires_at(&self) -> Option<i64> {
        self.closed_at
            .and_then(|t| t.checked_add(self.params.claim_deadline))
    }

    pub fn has_claimed(&self, bettor: &Address) -> bool {
        self.claimed.contains(bettor)
    }

    /// Awards paid out so far.
    pub fn paid_out(&self) -> Amount {
        self.paid_out
    }

    pub fn is_swept(&self) -> bool {
        self.swept
    }

    /// Net stake still held in custody on behalf of this round.
    pub fn unclaimed_balance(&self) -> Amount {
        if self.swept {
            return 0;
        }
        self.ledger.total_net_stake().saturating_sub(self.paid_out)
    }
}
