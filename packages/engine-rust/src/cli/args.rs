//! Flags shared by every maintenance subcommand.

use std::time::Duration;

use clap::Args;
use sweep_core::{Condition, DateRange, ParseError, DEFAULT_RANGE_FIELD};

use crate::engine::EngineConfig;
use crate::traits::MAX_BATCH_SIZE;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Start of the range (inclusive): `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or a full timestamp
    #[arg(long)]
    pub from: String,

    /// End of the range (inclusive); partial dates extend to the end of their period
    #[arg(long)]
    pub to: String,

    /// Extra condition as `field<op>value`, e.g. `source==email`
    #[arg(long = "where", value_name = "CONDITION")]
    pub condition: Option<String>,

    /// Field of a discrete extra condition
    #[arg(long)]
    pub field: Option<String>,

    /// Operator of a discrete extra condition (`==`, `!=`, `<`, `<=`, `>`, `>=`, `contains`)
    #[arg(long)]
    pub operator: Option<String>,

    /// Value of a discrete extra condition
    #[arg(long)]
    pub value: Option<String>,

    /// Report what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum matches per collection [default depends on the subcommand]
    #[arg(long)]
    pub limit: Option<usize>,

    /// Skip the interactive confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Matches shown per collection
    #[arg(long, default_value_t = 5)]
    pub preview: usize,

    /// Print reports and the summary as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Timestamp field the range applies to
    #[arg(long, default_value = DEFAULT_RANGE_FIELD)]
    pub range_field: String,

    /// Documents per delete batch (capped by the store)
    #[arg(long, default_value_t = MAX_BATCH_SIZE)]
    pub batch_size: usize,

    /// Seconds to wait after confirmation before deleting
    #[arg(long, default_value_t = 5)]
    pub grace_secs: u64,
}

impl RunArgs {
    /// # Errors
    ///
    /// Returns [`ParseError`] for malformed or inverted dates.
    pub fn range(&self) -> Result<DateRange, ParseError> {
        DateRange::parse(&self.from, &self.to)
    }

    /// The extra condition, from `--where` or the discrete flags.
    ///
    /// # Errors
    ///
    /// Both forms together give [`ParseError::ConflictingCondition`]; a
    /// partial discrete condition gives [`ParseError::IncompleteCondition`].
    pub fn condition(&self) -> Result<Option<Condition>, ParseError> {
        let discrete = (&self.field, &self.operator, &self.value);
        match (&self.condition, discrete) {
            (Some(_), (Some(_), _, _) | (_, Some(_), _) | (_, _, Some(_))) => {
                Err(ParseError::ConflictingCondition)
            }
            (Some(raw), _) => Condition::parse(raw).map(Some),
            (None, (None, None, None)) => Ok(None),
            (None, (Some(field), Some(operator), Some(value))) => {
                Condition::from_parts(field, operator, value).map(Some)
            }
            (None, _) => Err(ParseError::IncompleteCondition),
        }
    }

    #[must_use]
    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            range_field: self.range_field.clone(),
            batch_size: self.batch_size,
            grace_period: Duration::from_secs(self.grace_secs),
            preview_size: self.preview,
            ..EngineConfig::default()
        }
    }
}
