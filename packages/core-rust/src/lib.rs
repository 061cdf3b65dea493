//! Sweep Core: document values, predicate parsing, date ranges and query plans.

pub mod coerce;
pub mod condition;
pub mod error;
pub mod plan;
pub mod range;
pub mod types;

pub use coerce::{coerce_value, parse_timestamp, Bound, ValueHint};
pub use condition::{Condition, Operator};
pub use error::ParseError;
pub use plan::{QueryPlan, QueryPlanner, StoreQuery, DEFAULT_RANGE_FIELD};
pub use range::DateRange;
pub use types::{Document, DocumentRef, Value};
