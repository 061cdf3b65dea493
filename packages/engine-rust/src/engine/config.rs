use std::collections::BTreeMap;
use std::time::Duration;

use sweep_core::DEFAULT_RANGE_FIELD;

use crate::traits::MAX_BATCH_SIZE;

/// Collections `all` expands to.
pub const CANONICAL_COLLECTIONS: [&str; 6] =
    ["leads", "contacts", "activities", "notes", "tasks", "emailLogs"];

/// Short names accepted in place of canonical collection names.
pub const DEFAULT_ALIASES: [(&str, &str); 7] = [
    ("lead", "leads"),
    ("contact", "contacts"),
    ("activity", "activities"),
    ("note", "notes"),
    ("task", "tasks"),
    ("email", "emailLogs"),
    ("emails", "emailLogs"),
];

/// Fields tried, in order, for the human-readable label in a preview.
pub const DEFAULT_LABEL_FIELDS: [&str; 5] = ["name", "subject", "title", "fullName", "email"];

/// Engine-level configuration for maintenance runs.
///
/// Controls the range field, batch sizing, the confirmation grace period,
/// preview size and collection naming.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timestamp field every query is anchored on.
    pub range_field: String,
    /// Documents per delete batch. Clamped to the store's ceiling.
    pub batch_size: usize,
    /// Delay between confirmation and the first delete batch.
    pub grace_period: Duration,
    /// Number of matches shown in a preview.
    pub preview_size: usize,
    /// Collections the `all` selector expands to.
    pub canonical_collections: Vec<String>,
    /// Alias -> canonical collection name.
    pub aliases: BTreeMap<String, String>,
    /// Label fields for previews, in priority order.
    pub label_fields: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            range_field: DEFAULT_RANGE_FIELD.to_string(),
            batch_size: MAX_BATCH_SIZE,
            grace_period: Duration::from_secs(5),
            preview_size: 5,
            canonical_collections: CANONICAL_COLLECTIONS.iter().map(ToString::to_string).collect(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, name)| ((*alias).to_string(), (*name).to_string()))
                .collect(),
            label_fields: DEFAULT_LABEL_FIELDS.iter().map(ToString::to_string).collect(),
        }
    }
}
