//! Sweep Engine: index-aware bulk queries and batched deletion over a
//! document store, with the `sweep` maintenance CLI.

#[cfg(feature = "redb")]
pub mod cli;
pub mod engine;
pub mod storage;
pub mod traits;

pub use engine::{EngineConfig, EngineError, Orchestrator, RunRequest, RunSummary};
pub use storage::{IndexCatalog, MemoryStore, StoreError};
pub use traits::{DocumentStore, MAX_BATCH_SIZE};
