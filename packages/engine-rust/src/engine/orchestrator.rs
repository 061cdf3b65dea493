//! Runs the plan, execute, report, confirm and delete pipeline over one or
//! more collections and aggregates the outcomes.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sweep_core::{Condition, DateRange, ParseError, QueryPlanner};

use super::abort::AbortSignal;
use super::config::EngineConfig;
use super::console::Console;
use super::error::EngineError;
use super::executor::FallbackExecutor;
use super::gate::{ConfirmationGate, GateOutcome, RunMode};
use super::mutator::{BatchMutator, BatchResult};
use super::reporter::ResultReporter;
use crate::traits::DocumentStore;

/// Everything one invocation asks for.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Collection names, aliases, comma-separated lists or `all`.
    pub selectors: Vec<String>,
    pub range: DateRange,
    pub condition: Option<Condition>,
    pub dry_run: bool,
    pub assume_yes: bool,
    /// Per-collection match limit.
    pub limit: usize,
}

impl RunRequest {
    fn mode(&self) -> RunMode {
        RunMode {
            dry_run: self.dry_run,
            assume_yes: self.assume_yes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    NothingMatched,
    DryRun,
    Cancelled,
    Deleted,
    /// Some chunks committed, others failed.
    PartiallyDeleted,
    /// Every chunk failed.
    DeleteFailed,
    Interrupted,
    /// Not processed because an earlier collection was interrupted or the
    /// console failed.
    Skipped,
    Errored,
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NothingMatched => "nothing matched",
            Self::DryRun => "dry run",
            Self::Cancelled => "cancelled",
            Self::Deleted => "deleted",
            Self::PartiallyDeleted => "partially deleted",
            Self::DeleteFailed => "delete failed",
            Self::Interrupted => "interrupted",
            Self::Skipped => "skipped",
            Self::Errored => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub collection: String,
    pub status: CollectionStatus,
    pub matched: usize,
    pub degraded: bool,
    pub result: BatchResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectionSummary {
    fn new(collection: &str, status: CollectionStatus) -> Self {
        Self {
            collection: collection.to_string(),
            status,
            matched: 0,
            degraded: false,
            result: BatchResult::default(),
            error: None,
        }
    }

    /// True when the collection errored or any of its delete chunks failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.status == CollectionStatus::Errored || self.result.failed_chunks > 0
    }
}

/// Per-collection outcomes plus a grand total, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub collections: Vec<CollectionSummary>,
    pub matched: usize,
    pub total: BatchResult,
}

impl RunSummary {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            collections: Vec::new(),
            matched: 0,
            total: BatchResult::default(),
        }
    }

    fn push(&mut self, summary: CollectionSummary) {
        self.matched += summary.matched;
        self.total.absorb(&summary.result);
        self.collections.push(summary);
    }

    #[must_use]
    pub fn get(&self, collection: &str) -> Option<&CollectionSummary> {
        self.collections.iter().find(|c| c.collection == collection)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.collections.iter().any(CollectionSummary::failed)
    }

    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.collections
            .iter()
            .any(|c| c.status == CollectionStatus::Interrupted)
    }

    /// `130` if interrupted, `1` if anything failed, else `0`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.interrupted() {
            130
        } else if self.has_errors() {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Summary")?;
        if self.dry_run {
            f.write_str(" (dry run)")?;
        }
        f.write_str(":")?;
        let width = self
            .collections
            .iter()
            .map(|c| c.collection.len())
            .max()
            .unwrap_or(0);
        for c in &self.collections {
            write!(
                f,
                "\n  {:<width$}  {:>6} matched  {}",
                c.collection, c.matched, c.status
            )?;
            if matches!(
                c.status,
                CollectionStatus::Deleted
                    | CollectionStatus::PartiallyDeleted
                    | CollectionStatus::DeleteFailed
            ) {
                write!(f, " {}", c.result)?;
            }
            if c.degraded {
                f.write_str(" [filtered in memory]")?;
            }
            if let Some(err) = &c.error {
                write!(f, ": {err}")?;
            }
        }
        write!(f, "\nTotal: {} matched, {}", self.matched, self.total)
    }
}

/// Drives every requested collection through the pipeline, one at a time.
pub struct Orchestrator<C> {
    config: EngineConfig,
    planner: QueryPlanner,
    executor: FallbackExecutor,
    reporter: ResultReporter,
    gate: ConfirmationGate,
    mutator: BatchMutator,
    console: C,
}

impl<C: Console> Orchestrator<C> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: EngineConfig,
        console: C,
        abort: AbortSignal,
    ) -> Self {
        tracing::debug!(store = store.name(), ?config, "orchestrator created");
        Self {
            planner: QueryPlanner::new(config.range_field.clone()),
            executor: FallbackExecutor::new(Arc::clone(&store)),
            reporter: ResultReporter::new(
                config.preview_size,
                config.label_fields.clone(),
                config.range_field.clone(),
            ),
            gate: ConfirmationGate::new(config.grace_period, abort),
            mutator: BatchMutator::new(store, config.batch_size),
            config,
            console,
        }
    }

    #[must_use]
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Expands selectors into canonical collection names.
    ///
    /// Each selector may hold a comma-separated list. `all` expands to the
    /// canonical set, aliases map to their collection, unknown names pass
    /// through, and duplicates keep their first position.
    ///
    /// # Errors
    ///
    /// [`ParseError::NoCollections`] if nothing remains.
    pub fn resolve_collections<S: AsRef<str>>(&self, selectors: &[S]) -> Result<Vec<String>, ParseError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        let names = selectors
            .iter()
            .flat_map(|s| s.as_ref().split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        for name in names {
            let expanded: Vec<&str> = if name.eq_ignore_ascii_case("all") {
                self.config.canonical_collections.iter().map(String::as_str).collect()
            } else {
                vec![self.config.aliases.get(name).map_or(name, String::as_str)]
            };
            for collection in expanded {
                if seen.insert(collection.to_string()) {
                    resolved.push(collection.to_string());
                }
            }
        }

        if resolved.is_empty() {
            return Err(ParseError::NoCollections);
        }
        Ok(resolved)
    }

    /// Processes every resolved collection and shows the summary.
    ///
    /// Store failures are recorded against their collection and never stop
    /// the run. An interrupt or a console failure stops it: later
    /// collections are marked skipped and the summary is still shown.
    ///
    /// # Errors
    ///
    /// [`EngineError::Parse`] for an empty selection (before any store access)
    /// and [`EngineError::Console`] if the summary cannot be shown.
    pub async fn run(&mut self, request: &RunRequest) -> Result<RunSummary, EngineError> {
        let collections = self.resolve_collections(request.selectors.as_slice())?;
        tracing::info!(
            collections = %collections.join(","),
            range = %request.range,
            condition = request.condition.as_ref().map(ToString::to_string),
            dry_run = request.dry_run,
            limit = request.limit,
            "run started"
        );

        let mut summary = RunSummary::new(request.dry_run);
        let mut halted = false;

        for collection in &collections {
            if halted {
                summary.push(CollectionSummary::new(collection, CollectionStatus::Skipped));
                continue;
            }
            let outcome = match self.run_collection(collection, request).await {
                Ok(outcome) => outcome,
                Err(EngineError::Store(err)) => {
                    tracing::error!(collection = %collection, error = %err, "collection failed");
                    let mut errored = CollectionSummary::new(collection, CollectionStatus::Errored);
                    errored.error = Some(err.to_string());
                    errored
                }
                Err(err @ EngineError::Console(_)) => {
                    tracing::error!(collection = %collection, error = %err, "console failed, stopping run");
                    halted = true;
                    let mut errored = CollectionSummary::new(collection, CollectionStatus::Errored);
                    errored.error = Some(err.to_string());
                    errored
                }
                Err(err) => return Err(err),
            };
            halted |= outcome.status == CollectionStatus::Interrupted;
            summary.push(outcome);
        }

        tracing::info!(
            matched = summary.matched,
            deleted = summary.total.succeeded,
            failed_chunks = summary.total.failed_chunks,
            errored = summary.collections.iter().filter(|c| c.status == CollectionStatus::Errored).count(),
            "run finished"
        );
        self.console.summary(&summary).await.map_err(EngineError::Console)?;
        Ok(summary)
    }

    async fn run_collection(
        &mut self,
        collection: &str,
        request: &RunRequest,
    ) -> Result<CollectionSummary, EngineError> {
        let plan = self.planner.plan(
            collection,
            request.range,
            request.condition.as_ref(),
            request.limit,
        );
        let matches = self.executor.execute(&plan).await?;

        if matches.degraded {
            if let Some(extra) = &plan.extra {
                self.console
                    .notice(&format!(
                        "{collection}: no composite index on ({}, {}); condition applied in memory",
                        plan.range_field, extra.field
                    ))
                    .await
                    .map_err(EngineError::Console)?;
            }
        }

        let report = self
            .reporter
            .report(&matches, plan.extra.as_ref().map(|c| c.field.as_str()));
        self.console.show(&report).await.map_err(EngineError::Console)?;

        let mut summary = CollectionSummary::new(collection, CollectionStatus::NothingMatched);
        summary.matched = matches.len();
        summary.degraded = matches.degraded;

        summary.status = match self.gate.decide(&report, request.mode(), &mut self.console).await? {
            GateOutcome::NothingToDo => CollectionStatus::NothingMatched,
            GateOutcome::DryRun => CollectionStatus::DryRun,
            GateOutcome::Cancelled => CollectionStatus::Cancelled,
            GateOutcome::Interrupted => CollectionStatus::Interrupted,
            GateOutcome::Proceed => {
                summary.result = self.mutator.delete(&matches.refs()).await;
                tracing::info!(
                    collection = %collection,
                    deleted = summary.result.succeeded,
                    failed_chunks = summary.result.failed_chunks,
                    "collection deleted"
                );
                match (summary.result.failed_chunks, summary.result.succeeded) {
                    (0, _) => CollectionStatus::Deleted,
                    (_, 0) => CollectionStatus::DeleteFailed,
                    _ => CollectionStatus::PartiallyDeleted,
                }
            }
        };
        Ok(summary)
    }
}
