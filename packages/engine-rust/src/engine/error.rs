use sweep_core::ParseError;

use crate::storage::StoreError;

/// Errors that end a maintenance run.
///
/// Store errors inside a collection are normally absorbed into that
/// collection's outcome; they only surface here from the lower-level
/// components when called directly.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("console I/O failed: {0}")]
    Console(#[source] anyhow::Error),
}
