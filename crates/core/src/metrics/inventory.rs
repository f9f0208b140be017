//! Catalog counts and the target-type breakdown.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{DistributionSet, SoftwareModule, TargetType};
use crate::metrics::ranking::top_n_by;
use crate::target::Target;

/// Label for targets without a type assignment.
pub const UNTYPED_TARGETS: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub name: String,
    pub targets: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub target_types: u64,
    pub distribution_sets: u64,
    pub complete_distribution_sets: u64,
    pub incomplete_distribution_sets: u64,
    pub software_modules: u64,
    /// Targets per type, most populated first. Catalog types with no
    /// targets are listed with zero.
    pub targets_per_type: Vec<TypeCount>,
}

pub fn catalog_summary(
    target_types: &[TargetType],
    distribution_sets: &[DistributionSet],
    software_modules: &[SoftwareModule],
    targets: &[Target],
) -> CatalogSummary {
    let complete = distribution_sets.iter().filter(|d| d.complete).count() as u64;

    let mut per_type: Vec<TypeCount> = target_types
        .iter()
        .map(|t| TypeCount {
            name: t.name.clone(),
            targets: 0,
        })
        .collect();
    let mut index: HashMap<String, usize> = per_type
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.clone(), i))
        .collect();

    for target in targets {
        let name = target
            .target_type_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNTYPED_TARGETS);
        match index.get(name) {
            Some(&i) => per_type[i].targets += 1,
            None => {
                index.insert(name.to_string(), per_type.len());
                per_type.push(TypeCount {
                    name: name.to_string(),
                    targets: 1,
                });
            }
        }
    }

    let len = per_type.len();
    CatalogSummary {
        target_types: target_types.len() as u64,
        distribution_sets: distribution_sets.len() as u64,
        complete_distribution_sets: complete,
        incomplete_distribution_sets: distribution_sets.len() as u64 - complete,
        software_modules: software_modules.len() as u64,
        targets_per_type: top_n_by(per_type, len, |t| t.targets),
    }
}
