//! Wire format of the management REST API.
//!
//! Payloads are camelCase JSON with epoch-millisecond timestamps and HAL
//! style `_links`. Every field the dashboard can live without is optional
//! so a sparse or newer server response still decodes.

use chrono::DateTime;
use serde::Deserialize;

use fleetwatch_core::action::{Action, ActionLinks, ActionStatus, ActionType};
use fleetwatch_core::catalog::{DistributionSet, SoftwareModule, TargetType};
use fleetwatch_core::rollout::{
    Rollout, RolloutGroup, RolloutGroupStatus, RolloutStatus, TargetCounts,
};
use fleetwatch_core::target::{Target, UpdateStatus};
use fleetwatch_core::types::{EntityId, Timestamp};

use crate::query::Page;

fn millis(ms: Option<i64>) -> Option<Timestamp> {
    ms.and_then(DateTime::from_timestamp_millis)
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PageDto<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> PageDto<T> {
    /// Convert every entry; a missing `total` falls back to the page length.
    pub fn into_page<U>(self, convert: impl FnMut(T) -> U) -> Page<U> {
        let total = self.total.unwrap_or(self.content.len() as u64);
        Page {
            content: self.content.into_iter().map(convert).collect(),
            total,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Href {
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinksDto {
    #[serde(rename = "self", default)]
    pub self_link: Option<Href>,
    #[serde(default)]
    pub target: Option<Href>,
    #[serde(rename = "assignedDS", default)]
    pub assigned_ds: Option<Href>,
}

impl LinksDto {
    fn href(link: Option<Href>) -> Option<String> {
        link.and_then(|l| l.href).filter(|h| !h.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDto {
    pub controller_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_controller_request_at: Option<i64>,
    #[serde(default)]
    pub update_status: Option<String>,
    #[serde(default)]
    pub target_type_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub security_token: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: LinksDto,
}

impl From<TargetDto> for Target {
    fn from(dto: TargetDto) -> Self {
        let name = dto
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| dto.controller_id.clone());
        Self {
            controller_id: dto.controller_id,
            name,
            last_poll_at: millis(dto.last_controller_request_at),
            update_status: dto
                .update_status
                .as_deref()
                .map(UpdateStatus::parse)
                .unwrap_or_default(),
            target_type_name: dto.target_type_name,
            created_at: millis(dto.created_at),
            has_security_token: dto.security_token.is_some_and(|t| !t.is_empty()),
            assigned_distribution_set: LinksDto::href(dto.links.assigned_ds),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    pub id: EntityId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detail_status: Option<String>,
    #[serde(rename = "type", default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub last_modified_at: Option<i64>,
    #[serde(default)]
    pub last_status_code: Option<i32>,
    #[serde(default)]
    pub rollout: Option<EntityId>,
    #[serde(rename = "_links", default)]
    pub links: LinksDto,
}

impl ActionDto {
    /// The backend reports a coarse `status` (`pending`/`finished`) next to
    /// a fine-grained `detailStatus`; the detailed one wins when it parses.
    fn resolved_status(&self) -> ActionStatus {
        let detailed = self
            .detail_status
            .as_deref()
            .map(ActionStatus::parse)
            .unwrap_or_default();
        if detailed != ActionStatus::Unknown {
            return detailed;
        }
        self.status
            .as_deref()
            .map(ActionStatus::parse)
            .unwrap_or_default()
    }
}

impl From<ActionDto> for Action {
    fn from(dto: ActionDto) -> Self {
        let status = dto.resolved_status();
        Self {
            id: dto.id,
            status,
            action_type: dto
                .action_type
                .as_deref()
                .map(ActionType::parse)
                .unwrap_or_default(),
            created_at: millis(dto.created_at),
            last_modified_at: millis(dto.last_modified_at),
            detail_status: dto.detail_status,
            last_status_code: dto.last_status_code,
            rollout_id: dto.rollout,
            links: ActionLinks {
                self_href: LinksDto::href(dto.links.self_link),
                target_href: LinksDto::href(dto.links.target),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Rollouts
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TargetCountsDto {
    #[serde(default)]
    pub running: u64,
    #[serde(default, alias = "notStarted")]
    pub notstarted: u64,
    #[serde(default)]
    pub scheduled: u64,
    #[serde(default, alias = "canceled")]
    pub cancelled: u64,
    #[serde(default)]
    pub finished: u64,
    #[serde(default)]
    pub error: u64,
}

impl From<TargetCountsDto> for TargetCounts {
    fn from(dto: TargetCountsDto) -> Self {
        Self {
            running: dto.running,
            not_started: dto.notstarted,
            scheduled: dto.scheduled,
            canceled: dto.cancelled,
            finished: dto.finished,
            error: dto.error,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutDto {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_targets: Option<u64>,
    #[serde(default)]
    pub total_targets_per_status: Option<TargetCountsDto>,
    #[serde(default)]
    pub total_groups: Option<u32>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub distribution_set_id: Option<EntityId>,
}

impl From<RolloutDto> for Rollout {
    fn from(dto: RolloutDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name.unwrap_or_else(|| format!("rollout-{}", dto.id)),
            status: dto
                .status
                .as_deref()
                .map(RolloutStatus::parse)
                .unwrap_or_default(),
            total_targets: dto.total_targets.unwrap_or(0),
            targets_per_status: dto.total_targets_per_status.unwrap_or_default().into(),
            total_groups: dto.total_groups.unwrap_or(0),
            created_at: millis(dto.created_at),
            distribution_set_id: dto.distribution_set_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutGroupDto {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_targets: Option<u64>,
    #[serde(default)]
    pub total_targets_per_status: Option<TargetCountsDto>,
}

impl RolloutGroupDto {
    /// Groups do not name their parent on the wire; the caller knows it.
    pub fn into_group(self, rollout_id: EntityId) -> RolloutGroup {
        RolloutGroup {
            id: self.id,
            rollout_id,
            name: self.name.unwrap_or_else(|| format!("group-{}", self.id)),
            status: self
                .status
                .as_deref()
                .map(RolloutGroupStatus::parse)
                .unwrap_or_default(),
            total_targets: self.total_targets.unwrap_or(0),
            targets_per_status: self.total_targets_per_status.unwrap_or_default().into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTypeDto {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub colour: Option<String>,
}

impl From<TargetTypeDto> for TargetType {
    fn from(dto: TargetTypeDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            description: dto.description,
            colour: dto.colour,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSetDto {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl From<DistributionSetDto> for DistributionSet {
    fn from(dto: DistributionSetDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            version: dto.version,
            type_name: dto.type_name,
            complete: dto.complete,
            created_at: millis(dto.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareModuleDto {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl From<SoftwareModuleDto> for SoftwareModule {
    fn from(dto: SoftwareModuleDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            version: dto.version,
            type_name: dto.type_name,
            created_at: millis(dto.created_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn target_decodes_sparse_payload() {
        let dto: TargetDto = serde_json::from_value(json!({
            "controllerId": "dev-01",
            "updateStatus": "IN_SYNC",
            "lastControllerRequestAt": 1714564800000_i64,
            "securityToken": "abc",
            "_links": { "assignedDS": { "href": "https://mgmt/rest/v1/distributionsets/7" } }
        }))
        .unwrap();
        let target = Target::from(dto);
        assert_eq!(target.name, "dev-01");
        assert_eq!(target.update_status, UpdateStatus::InSync);
        assert_eq!(
            target.last_poll_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert!(target.has_security_token);
        assert_eq!(
            target.assigned_distribution_set.as_deref(),
            Some("https://mgmt/rest/v1/distributionsets/7")
        );
    }

    #[test]
    fn null_status_is_unknown() {
        let dto: TargetDto = serde_json::from_value(json!({
            "controllerId": "dev-02",
            "updateStatus": null
        }))
        .unwrap();
        assert_eq!(Target::from(dto).update_status, UpdateStatus::Unknown);
    }

    #[test]
    fn action_prefers_detail_status() {
        let dto: ActionDto = serde_json::from_value(json!({
            "id": 12,
            "status": "pending",
            "detailStatus": "downloading",
            "type": "forced",
            "_links": {
                "self": { "href": "https://mgmt/rest/v1/targets/dev-01/actions/12" },
                "target": { "href": "https://mgmt/rest/v1/targets/dev-01" }
            }
        }))
        .unwrap();
        let action = Action::from(dto);
        assert_eq!(action.status, ActionStatus::Downloading);
        assert_eq!(action.action_type, ActionType::Forced);
        assert_eq!(
            action.links.target_href.as_deref(),
            Some("https://mgmt/rest/v1/targets/dev-01")
        );
    }

    #[test]
    fn action_falls_back_to_coarse_status() {
        let dto: ActionDto = serde_json::from_value(json!({
            "id": 13,
            "status": "finished",
            "detailStatus": "some future state"
        }))
        .unwrap();
        assert_eq!(Action::from(dto).status, ActionStatus::Finished);
    }

    #[test]
    fn rollout_counts_use_backend_spelling() {
        let dto: RolloutDto = serde_json::from_value(json!({
            "id": 4,
            "name": "Spring update",
            "status": "running",
            "totalTargets": 20,
            "totalTargetsPerStatus": {
                "running": 5, "notstarted": 3, "scheduled": 2,
                "cancelled": 1, "finished": 8, "error": 1
            },
            "totalGroups": 4,
            "distributionSetId": 7
        }))
        .unwrap();
        let rollout = Rollout::from(dto);
        assert_eq!(rollout.status, RolloutStatus::Running);
        assert_eq!(rollout.targets_per_status.not_started, 3);
        assert_eq!(rollout.targets_per_status.canceled, 1);
        assert_eq!(rollout.targets_per_status.finished, 8);
    }

    #[test]
    fn group_gets_parent_from_caller() {
        let dto: RolloutGroupDto = serde_json::from_value(json!({
            "id": 31, "name": "canary", "status": "running", "totalTargets": 5
        }))
        .unwrap();
        let group = dto.into_group(4);
        assert_eq!(group.rollout_id, 4);
        assert_eq!(group.status, RolloutGroupStatus::Running);
    }

    #[test]
    fn page_without_total_uses_length() {
        let dto: PageDto<TargetTypeDto> = serde_json::from_value(json!({
            "content": [{ "id": 1, "name": "gateway" }, { "id": 2, "name": "sensor" }]
        }))
        .unwrap();
        let page = dto.into_page(TargetType::from);
        assert_eq!(page.total, 2);
        assert_eq!(page.content[1].name, "sensor");
    }
}
