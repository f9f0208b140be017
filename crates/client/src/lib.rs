//! Read collaborator for the fleet management backend.
//!
//! [`ResourceSource`] is the seam the dashboard engine polls through;
//! [`ManagementClient`] implements it over the management REST API.

pub mod api;
pub mod config;
pub mod error;
pub mod query;
pub mod source;
pub mod wire;

pub use api::ManagementClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use query::{FilterExpr, ListQuery, Page};
pub use source::ResourceSource;
