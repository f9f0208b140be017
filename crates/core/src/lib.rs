//! Fleetwatch domain model and metric derivation.
//!
//! Everything in this crate is pure: entities are passed in by the caller,
//! the observation time comes from a [`clock::StableClock`], and the
//! derivation pass in [`metrics`] never touches the network or the wall
//! clock on its own.

pub mod action;
pub mod catalog;
pub mod clock;
pub mod correlator;
pub mod error;
pub mod metrics;
pub mod rollout;
pub mod snapshot;
pub mod target;
pub mod thresholds;
pub mod types;

pub use clock::{Clock, FixedClock, StableClock, SystemClock};
pub use error::CoreError;
pub use metrics::classification::{FreshnessWindow, OnlinePolicy};
pub use metrics::{derive, DashboardMetrics, DerivedSnapshot};
pub use snapshot::{ResourceKind, ResourceSnapshot};
pub use thresholds::{Thresholds, TrendConfig, TrendWindow};
