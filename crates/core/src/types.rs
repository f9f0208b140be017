/// Numeric backend identifiers (actions, rollouts, groups, packages).
pub type EntityId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
