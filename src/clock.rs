//! Wall-clock source
//!
//! The engine reads time only through [`Clock`]. Production wiring uses
//! [`SystemClock`]; simulations and tests drive a [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Unix timestamp in seconds.
pub type UnixSecs = i64;

pub trait Clock {
    fn now(&self) -> UnixSecs;
}

/// Reads `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixSecs {
        chrono::Utc::now().timestamp()
    }
}

/// Settable clock. Clones share the same instant, so a test can keep a handle
/// and move time while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    current: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: UnixSecs) -> Self {
        Self {
            current: Arc::new(AtomicI64::new(start)),
        }
    }

    pub fn set(&self, now: UnixSecs) {
        self.current.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixSecs {
        self.current.load(Ordering::SeqCst)
    }
}

impl fmt::Display for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.now())
    }
}
