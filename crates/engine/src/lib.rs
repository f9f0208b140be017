//! Polling and aggregation engine for the fleet dashboard.
//!
//! One [`poller::ResourcePoller`] per backend resource feeds a
//! [`store::SnapshotStore`]; a derivation task turns each merged snapshot
//! into a [`DashboardSnapshot`] published through a watch channel. Polling
//! only runs while the [`VisibilityGate`] is open.

pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod poller;
pub mod store;
pub mod visibility;

pub use config::EngineConfig;
pub use coordinator::RefreshCoordinator;
pub use dashboard::{DashboardEngine, DashboardSnapshot};
pub use error::EngineError;
pub use visibility::VisibilityGate;
