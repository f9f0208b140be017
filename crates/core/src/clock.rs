//! Observation time for one derivation pass.
//!
//! A [`StableClock`] is captured exactly once when a new merged snapshot
//! becomes available. Every elapsed-time, delay-level and bucket placement
//! in that pass reads the same value, so two metrics computed a few
//! microseconds apart can never disagree about the same entity.

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::types::Timestamp;

/// Source of "now". Injected so tests can pin time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// The single "now" of one derivation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StableClock {
    now: Timestamp,
}

impl StableClock {
    /// Sample `clock` once.
    pub fn capture(clock: &dyn Clock) -> Self {
        Self { now: clock.now() }
    }

    pub fn at(now: Timestamp) -> Self {
        Self { now }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Time elapsed since `ts`, clamped at zero for timestamps in the future.
    pub fn elapsed_since(&self, ts: Timestamp) -> Duration {
        let elapsed = self.now.signed_duration_since(ts);
        if elapsed < Duration::zero() {
            Duration::zero()
        } else {
            elapsed
        }
    }

    /// Start of a trailing window of length `window` ending now.
    pub fn window_start(&self, window: Duration) -> Timestamp {
        self.now - window
    }
}
