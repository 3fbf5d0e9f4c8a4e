//! GamePool settlement engine
//!
//! Pooled-stake prediction rounds over a fixed set of outcomes: bets are taken
//! while a round is open, an external oracle supplies start and end rates, and
//! the whole net pool is redistributed to bettors on the winning outcome(s).
//!
//! Exposes the engine modules for the `gamepool` binary and for tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod pool;
pub mod round;
pub mod scenario;
pub mod service;
pub mod settlement;
pub mod store;
pub mod threshold;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use events::GamePoolEvent;
pub use ledger::{Address, Amount, PaperValueLedger, ValueLedger};
pub use pool::GamePool;
pub use round::{RoundId, RoundParams, RoundState};
pub use settlement::{CloseOutcome, VoidReason, WinnerSet};
