//! Round Registry & Lifecycle
//!
//! A round is one betting epoch over a fixed set of outcomes. This module owns
//! round creation (`registry`), the immutable parameters (`params`), the stored
//! record (`record`) and the pure lifecycle derivation (`state`).

pub mod params;
pub mod record;
pub mod registry;
pub mod state;

pub use params::RoundParams;
pub use record::{RateVector, Round};
pub use registry::RoundRegistry;
pub use state::{derive_state, RoundState};

/// Dense, monotonic round identifier.
pub type RoundId = u64;
