//! Maintenance run pipeline.
//!
//! Each collection flows through the same stages:
//!
//! 1. **Planning** (`sweep_core::QueryPlanner`): range-anchored `QueryPlan`
//! 2. **Execution** (`executor`): compound query, or range-only query plus an
//!    in-memory filter when the composite index is missing
//! 3. **Reporting** (`reporter`): count and bounded preview
//! 4. **Confirmation** (`gate`): dry run, `--yes`, typed `yes`, grace period
//! 5. **Deletion** (`mutator`): sequential chunks under the store's batch ceiling
//!
//! The `orchestrator` runs the stages per collection and builds the summary.

pub mod abort;
pub mod config;
pub mod console;
pub mod error;
pub mod executor;
pub mod gate;
pub mod mutator;
pub mod orchestrator;
pub mod reporter;

// Re-export key types for convenient access.
pub use abort::{AbortController, AbortSignal};
pub use config::{EngineConfig, CANONICAL_COLLECTIONS, DEFAULT_ALIASES, DEFAULT_LABEL_FIELDS};
pub use console::{Console, ScriptedConsole, TerminalConsole};
pub use error::EngineError;
pub use executor::{FallbackExecutor, MatchSet};
pub use gate::{ConfirmationGate, GateOutcome, GateState, RunMode};
pub use mutator::{BatchMutator, BatchResult};
pub use orchestrator::{
    CollectionStatus, CollectionSummary, Orchestrator, RunRequest, RunSummary,
};
pub use reporter::{FieldPreview, MatchReport, PreviewEntry, ResultReporter};
