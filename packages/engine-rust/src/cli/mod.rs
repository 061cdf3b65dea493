//! `sweep` command line: date-range purges, note cleanup and a query console.

pub mod args;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use sweep_core::ParseError;
use tracing_subscriber::EnvFilter;

pub use args::RunArgs;

use crate::engine::{AbortController, EngineError, Orchestrator, RunRequest, TerminalConsole};
use crate::storage::{IndexCatalog, IndexSpecError, RedbStore};

/// Exit code for parse and usage errors.
pub const EXIT_USAGE: i32 = 2;

/// Sweep: conditional bulk maintenance for CRM collections
#[derive(Parser, Debug)]
#[command(name = "sweep", version, about)]
pub struct Cli {
    /// Path of the document database
    #[arg(long, global = true, env = "SWEEP_DB", default_value = "sweep.redb")]
    pub db: PathBuf,

    /// Composite index available in the store, as `collection:field` (repeatable)
    #[arg(
        long = "index",
        global = true,
        env = "SWEEP_INDEXES",
        value_delimiter = ',',
        value_name = "COLLECTION:FIELD"
    )]
    pub indexes: Vec<String>,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delete documents created in a date range, across one or more collections
    Purge {
        /// Collections, aliases, comma-separated lists or `all`
        #[arg(long, required = true, num_args = 1..)]
        collections: Vec<String>,

        #[command(flatten)]
        args: RunArgs,
    },
    /// Delete notes created in a date range, optionally matching a condition
    Notes {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Query collections by date range and condition; deletes only with --delete
    Query {
        /// Collections, aliases, comma-separated lists or `all`
        #[arg(long, num_args = 1.., default_value = "all")]
        collections: Vec<String>,

        /// Offer to delete the matches
        #[arg(long)]
        delete: bool,

        #[command(flatten)]
        args: RunArgs,
    },
}

impl Command {
    pub const PURGE_LIMIT: usize = 1000;
    pub const NOTES_LIMIT: usize = 500;
    pub const QUERY_LIMIT: usize = 100;

    #[must_use]
    pub fn args(&self) -> &RunArgs {
        match self {
            Self::Purge { args, .. } | Self::Notes { args } | Self::Query { args, .. } => args,
        }
    }

    /// Builds the engine request for this subcommand.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for a malformed range or condition.
    pub fn request(&self) -> Result<RunRequest, ParseError> {
        let args = self.args();
        let (selectors, limit, read_only) = match self {
            Self::Purge { collections, .. } => (collections.clone(), Self::PURGE_LIMIT, false),
            Self::Notes { .. } => (vec!["notes".to_string()], Self::NOTES_LIMIT, false),
            Self::Query {
                collections, delete, ..
            } => (collections.clone(), Self::QUERY_LIMIT, !delete),
        };
        Ok(RunRequest {
            selectors,
            range: args.range()?,
            condition: args.condition()?,
            dry_run: args.dry_run || read_only,
            assume_yes: args.yes,
            limit: args.limit_or(limit),
        })
    }
}

impl Cli {
    /// Runs the selected subcommand and returns the process exit code.
    ///
    /// Every argument is validated before the store is opened.
    ///
    /// # Errors
    ///
    /// Parse errors, index declaration errors, store open failures and
    /// console failures. Per-collection store errors are reported in the
    /// summary and reflected in the exit code instead.
    pub async fn run(self) -> anyhow::Result<i32> {
        let request = self.command.request()?;
        let catalog = IndexCatalog::from_specs(&self.indexes)?;
        let args = self.command.args();

        let store = Arc::new(RedbStore::open(&self.db, catalog)?);
        tracing::info!(db = %self.db.display(), indexes = self.indexes.len(), "store opened");

        let controller = AbortController::new();
        let signal = controller.signal();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, aborting run");
                controller.trigger();
            }
        });

        let console = TerminalConsole::new(args.json);
        let mut orchestrator = Orchestrator::new(store, args.engine_config(), console, signal);
        let summary = orchestrator.run(&request).await?;
        Ok(summary.exit_code())
    }
}

/// Installs the global tracing subscriber, writing to stderr. `RUST_LOG`
/// overrides the default `info` filter.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}

/// Maps a failed run to a process exit code: [`EXIT_USAGE`] for bad input,
/// `1` for everything else.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let usage = err.is::<ParseError>()
        || err.is::<IndexSpecError>()
        || matches!(err.downcast_ref::<EngineError>(), Some(EngineError::Parse(_)));
    if usage {
        EXIT_USAGE
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use sweep_core::Operator;

    use super::*;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).unwrap()
    }

    const RANGE: [&str; 4] = ["--from", "2025-01-01", "--to", "2025-01-31"];

    fn argv<'a>(head: &[&'a str], tail: &[&'a str]) -> Vec<&'a str> {
        let mut v = vec!["sweep"];
        v.extend_from_slice(head);
        v.extend_from_slice(&RANGE);
        v.extend_from_slice(tail);
        v
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn purge_defaults() {
        let cli = parse(&argv(&["purge", "--collections", "lead,notes"], &[]));
        assert_eq!(cli.db, PathBuf::from("sweep.redb"));
        assert_eq!(cli.log_format, LogFormat::Text);

        let request = cli.command.request().unwrap();
        assert_eq!(request.selectors, vec!["lead,notes"]);
        assert_eq!(request.limit, 1000);
        assert!(!request.dry_run);
        assert!(!request.assume_yes);
        assert!(request.condition.is_none());
    }

    #[test]
    fn purge_requires_collections() {
        assert!(Cli::try_parse_from(argv(&["purge"], &[])).is_err());
    }

    #[test]
    fn notes_targets_the_notes_collection() {
        let cli = parse(&argv(&["notes"], &["--where", "routingMethod==metadata", "--yes"]));
        let request = cli.command.request().unwrap();

        assert_eq!(request.selectors, vec!["notes"]);
        assert_eq!(request.limit, 500);
        assert!(request.assume_yes);
        assert_eq!(request.condition.unwrap().field, "routingMethod");
    }

    #[test]
    fn query_is_read_only_unless_delete() {
        let cli = parse(&argv(&["query"], &[]));
        let request = cli.command.request().unwrap();
        assert_eq!(request.selectors, vec!["all"]);
        assert_eq!(request.limit, 100);
        assert!(request.dry_run);

        let cli = parse(&argv(&["query", "--collections", "tasks", "--delete"], &["--limit", "7"]));
        let request = cli.command.request().unwrap();
        assert!(!request.dry_run);
        assert_eq!(request.limit, 7);
    }

    #[test]
    fn discrete_condition_flags_build_a_condition() {
        let cli = parse(&argv(
            &["notes"],
            &["--field", "priority", "--operator", "gte", "--value", "3"],
        ));
        let condition = cli.command.request().unwrap().condition.unwrap();
        assert_eq!(condition.operator, Operator::Gte);
        assert_eq!(condition.value, sweep_core::Value::Int(3));
    }

    #[test]
    fn partial_discrete_condition_is_rejected() {
        let cli = parse(&argv(&["notes"], &["--field", "priority", "--value", "3"]));
        assert_eq!(
            cli.command.request().unwrap_err(),
            ParseError::IncompleteCondition
        );
    }

    #[test]
    fn both_condition_forms_conflict() {
        let cli = parse(&argv(&["notes"], &["--where", "a==b", "--field", "c"]));
        assert_eq!(
            cli.command.request().unwrap_err(),
            ParseError::ConflictingCondition
        );
    }

    #[test]
    fn inverted_range_is_a_parse_error() {
        let cli = parse(&[
            "sweep", "notes", "--from", "2025-02-01", "--to", "2025-01-01",
        ]);
        assert!(matches!(
            cli.command.request(),
            Err(ParseError::InvertedRange { .. })
        ));
    }

    #[test]
    fn global_flags_and_engine_config() {
        let cli = parse(&argv(
            &["--index", "leads:source,notes:routingMethod", "purge", "--collections", "all"],
            &["--grace-secs", "0", "--batch-size", "50", "--preview", "2", "--log-format", "json"],
        ));
        assert_eq!(cli.indexes, vec!["leads:source", "notes:routingMethod"]);
        assert_eq!(cli.log_format, LogFormat::Json);

        let config = cli.command.args().engine_config();
        assert!(config.grace_period.is_zero());
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.preview_size, 2);
        assert_eq!(config.range_field, "createdAt");
    }

    #[test]
    fn second_tracing_init_reports_an_error() {
        let _ = init_tracing(LogFormat::Json);
        assert!(init_tracing(LogFormat::Text).is_err());
    }

    #[test]
    fn usage_errors_map_to_exit_two() {
        assert_eq!(exit_code(&anyhow::Error::new(ParseError::NoCollections)), EXIT_USAGE);
        assert_eq!(
            exit_code(&anyhow::Error::new(EngineError::Parse(ParseError::NoCollections))),
            EXIT_USAGE
        );
        let spec = IndexCatalog::from_specs(["broken"]).unwrap_err();
        assert_eq!(exit_code(&anyhow::Error::new(spec)), EXIT_USAGE);
        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
    }
}
