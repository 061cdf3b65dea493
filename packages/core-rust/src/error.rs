//! Errors raised while turning operator input into typed filters.

/// Malformed predicate, date or selection input.
///
/// Always raised before any store access is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no comparison operator found in condition `{input}`")]
    MissingOperator { input: String },
    #[error("condition `{input}` has an empty field name")]
    EmptyField { input: String },
    #[error("condition `{input}` has an empty value")]
    EmptyValue { input: String },
    #[error("unknown operator `{operator}` (expected one of ==, !=, <, <=, >, >=, contains)")]
    UnknownOperator { operator: String },
    #[error("incomplete condition: --field, --operator and --value must be given together")]
    IncompleteCondition,
    #[error("conflicting conditions: use either --where or --field/--operator/--value")]
    ConflictingCondition,
    #[error("`{input}` is not a recognised date or timestamp")]
    InvalidTimestamp { input: String },
    #[error("date range is inverted: from {from} is after to {to}")]
    InvertedRange { from: String, to: String },
    #[error("no target collections selected")]
    NoCollections,
}
