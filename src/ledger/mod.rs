//! Bet Ledger & Value Custody
//!
//! - `bets`: per-outcome stake aggregates, append-only while a round is Open
//! - `custody`: the value-transfer boundary (`ValueLedger`) and its in-memory
//!   paper implementation
//! - `amount`: exact integer money helpers

pub mod address;
pub mod amount;
pub mod bets;
pub mod custody;

pub use address::Address;
pub use amount::*;
pub use bets::*;
pub use custody::*;
