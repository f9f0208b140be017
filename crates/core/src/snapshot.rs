//! The merged input of one derivation pass.

use std::sync::Arc;

use serde::Serialize;

use crate::action::Action;
use crate::catalog::{DistributionSet, SoftwareModule, TargetType};
use crate::rollout::Rollout;
use crate::target::Target;

/// The observed backend resources, one poller each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Targets,
    Actions,
    Rollouts,
    TargetTypes,
    DistributionSets,
    SoftwareModules,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::Targets,
        Self::Actions,
        Self::Rollouts,
        Self::TargetTypes,
        Self::DistributionSets,
        Self::SoftwareModules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Targets => "targets",
            Self::Actions => "actions",
            Self::Rollouts => "rollouts",
            Self::TargetTypes => "target_types",
            Self::DistributionSets => "distribution_sets",
            Self::SoftwareModules => "software_modules",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest successfully fetched collection of every resource.
///
/// Each collection sits behind its own `Arc`. A poller that refreshes
/// with identical content keeps the old `Arc`, so pointer identity tells
/// whether an input actually changed.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    pub targets: Arc<Vec<Target>>,
    pub actions: Arc<Vec<Action>>,
    pub rollouts: Arc<Vec<Rollout>>,
    pub target_types: Arc<Vec<TargetType>>,
    pub distribution_sets: Arc<Vec<DistributionSet>>,
    pub software_modules: Arc<Vec<SoftwareModule>>,
}

impl ResourceSnapshot {
    /// True when every collection is the very same allocation as in `other`.
    pub fn same_inputs(&self, other: &ResourceSnapshot) -> bool {
        Arc::ptr_eq(&self.targets, &other.targets)
            && Arc::ptr_eq(&self.actions, &other.actions)
            && Arc::ptr_eq(&self.rollouts, &other.rollouts)
            && Arc::ptr_eq(&self.target_types, &other.target_types)
            && Arc::ptr_eq(&self.distribution_sets, &other.distribution_sets)
            && Arc::ptr_eq(&self.software_modules, &other.software_modules)
    }
}
