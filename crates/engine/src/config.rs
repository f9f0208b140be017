use std::time::Duration;

use fleetwatch_client::config::env_parse;
use fleetwatch_client::{FilterExpr, ListQuery};
use fleetwatch_core::Thresholds;

/// Newest actions first so the page covers the recent trend windows.
pub const ACTION_SORT: &str = "createdAt:DESC";

/// Polling cadence, page sizes and metric thresholds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Period for adaptive resources while something is in progress.
    pub active_poll: Duration,
    /// Period for adaptive resources when nothing is in progress.
    pub idle_poll: Duration,
    /// Period for reference data (target types, distribution sets, modules).
    pub reference_poll: Duration,
    pub target_limit: u32,
    pub action_limit: u32,
    pub rollout_limit: u32,
    pub catalog_limit: u32,
    pub group_limit: u32,
    /// Raw filter applied to the targets query.
    pub target_filter: Option<String>,
    /// Initial value of the visibility gate.
    pub start_visible: bool,
    pub thresholds: Thresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            active_poll: Duration::from_secs(3),
            idle_poll: Duration::from_secs(30),
            reference_poll: Duration::from_secs(60),
            target_limit: 500,
            action_limit: 500,
            rollout_limit: 100,
            catalog_limit: 100,
            group_limit: 100,
            target_filter: None,
            start_visible: true,
            thresholds: Thresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default |
    /// |----------------------------------|---------|
    /// | `ACTIVE_POLL_SECS`               | `3`     |
    /// | `IDLE_POLL_SECS`                 | `30`    |
    /// | `REFERENCE_POLL_SECS`            | `60`    |
    /// | `TARGET_PAGE_LIMIT`              | `500`   |
    /// | `ACTION_PAGE_LIMIT`              | `500`   |
    /// | `ROLLOUT_PAGE_LIMIT`             | `100`   |
    /// | `CATALOG_PAGE_LIMIT`             | `100`   |
    /// | `GROUP_PAGE_LIMIT`               | `100`   |
    /// | `TARGET_FILTER`                  | unset   |
    /// | `START_VISIBLE`                  | `true`  |
    /// | `ONLINE_FRESHNESS_MINUTES`       | `10`    |
    /// | `DELAYED_AFTER_MINUTES`          | `10`    |
    /// | `STUCK_AFTER_MINUTES`            | `30`    |
    /// | `ACTIVE_ACTIONS_WARNING`         | `30`    |
    /// | `AVG_COMPLETION_WARNING_MINUTES` | `15`    |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let t = defaults.thresholds;
        Self {
            active_poll: secs("ACTIVE_POLL_SECS", defaults.active_poll),
            idle_poll: secs("IDLE_POLL_SECS", defaults.idle_poll),
            reference_poll: secs("REFERENCE_POLL_SECS", defaults.reference_poll),
            target_limit: env_parse("TARGET_PAGE_LIMIT", defaults.target_limit),
            action_limit: env_parse("ACTION_PAGE_LIMIT", defaults.action_limit),
            rollout_limit: env_parse("ROLLOUT_PAGE_LIMIT", defaults.rollout_limit),
            catalog_limit: env_parse("CATALOG_PAGE_LIMIT", defaults.catalog_limit),
            group_limit: env_parse("GROUP_PAGE_LIMIT", defaults.group_limit),
            target_filter: std::env::var("TARGET_FILTER")
                .ok()
                .filter(|f| !f.trim().is_empty()),
            start_visible: env_parse("START_VISIBLE", defaults.start_visible),
            thresholds: Thresholds {
                online_freshness_minutes: env_parse(
                    "ONLINE_FRESHNESS_MINUTES",
                    t.online_freshness_minutes,
                ),
                delayed_after_minutes: env_parse("DELAYED_AFTER_MINUTES", t.delayed_after_minutes),
                stuck_after_minutes: env_parse("STUCK_AFTER_MINUTES", t.stuck_after_minutes),
                active_actions_warning: env_parse(
                    "ACTIVE_ACTIONS_WARNING",
                    t.active_actions_warning,
                ),
                avg_completion_warning_minutes: env_parse(
                    "AVG_COMPLETION_WARNING_MINUTES",
                    t.avg_completion_warning_minutes,
                ),
                ..t
            },
        }
    }

    pub fn target_query(&self) -> ListQuery {
        let query = ListQuery::limit(self.target_limit);
        match &self.target_filter {
            Some(filter) => query.with_filter(FilterExpr::raw(filter.clone())),
            None => query,
        }
    }

    pub fn action_query(&self) -> ListQuery {
        ListQuery::limit(self.action_limit).with_sort(ACTION_SORT)
    }

    pub fn rollout_query(&self) -> ListQuery {
        ListQuery::limit(self.rollout_limit)
    }

    pub fn catalog_query(&self) -> ListQuery {
        ListQuery::limit(self.catalog_limit)
    }
}

fn secs(key: &str, default: Duration) -> Duration {
    let secs = env_parse(key, default.as_secs());
    if secs == 0 {
        tracing::warn!(key, "Poll period must be positive, using default");
        return default;
    }
    Duration::from_secs(secs)
}
