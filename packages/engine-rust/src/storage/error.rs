/// Errors returned across the [`DocumentStore`](crate::DocumentStore) boundary.
///
/// [`IndexUnavailable`](StoreError::IndexUnavailable) is the only variant the
/// engine recovers from; every other variant is a store access failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("collection `{collection}` has no composite index on ({})", .fields.join(", "))]
    IndexUnavailable {
        collection: String,
        fields: Vec<String>,
        /// How the index could be created, if the store knows.
        hint: Option<String>,
    },
    #[error("permission denied on `{collection}`: {reason}")]
    PermissionDenied { collection: String, reason: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("delete batch of {size} documents exceeds the store limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },
    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether this is the recoverable missing-composite-index failure.
    #[must_use]
    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, Self::IndexUnavailable { .. })
    }
}
