//! Read-only reference data: target types and package metadata.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

/// A device-type catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetType {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub colour: Option<String>,
}

/// A versioned, deployable bundle of software modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSet {
    pub id: EntityId,
    pub name: String,
    pub version: String,
    pub type_name: Option<String>,
    /// Whether every mandatory module type is present.
    pub complete: bool,
    pub created_at: Option<Timestamp>,
}

/// A single versioned software artifact bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareModule {
    pub id: EntityId,
    pub name: String,
    pub version: String,
    pub type_name: Option<String>,
    pub created_at: Option<Timestamp>,
}

/// Common view over package metadata used by recency lists.
pub trait Package {
    fn id(&self) -> EntityId;
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn type_name(&self) -> Option<&str>;
    fn created_at(&self) -> Option<Timestamp>;
}

impl Package for DistributionSet {
    fn id(&self) -> EntityId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn version(&self) -> &str {
        &self.version
    }
    fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }
    fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }
}

impl Package for SoftwareModule {
    fn id(&self) -> EntityId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn version(&self) -> &str {
        &self.version
    }
    fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }
    fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }
}
