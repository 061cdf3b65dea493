//! Single-field comparison predicates.
//!
//! A [`Condition`] is parsed from a combined `field<op>value` string or from
//! discrete field/operator/value arguments, and evaluated against documents
//! with [`Condition::matches`]. Stores and the in-memory fallback path share
//! that evaluation so both produce identical match sets.

use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coerce::{coerce_value, ValueHint};
use crate::error::ParseError;
use crate::types::{Document, Value};

/// Comparison operators supported in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Array membership.
    Contains,
}

impl Operator {
    /// Every operator, longest tokens first.
    pub const PARSE_ORDER: [Operator; 7] = [
        Operator::Contains,
        Operator::Eq,
        Operator::Ne,
        Operator::Lte,
        Operator::Gte,
        Operator::Lt,
        Operator::Gt,
    ];

    /// Canonical token, as shown to operators.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Contains => "contains",
        }
    }

    /// Token searched for when splitting a combined string. The word
    /// operator needs surrounding spaces so it cannot match inside a field
    /// name such as `containsPii`.
    fn split_token(self) -> &'static str {
        match self {
            Self::Contains => " contains ",
            other => other.token(),
        }
    }

    /// Whether the operator orders values rather than testing equality.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "==" | "eq" => Ok(Self::Eq),
            "!=" | "ne" | "neq" => Ok(Self::Ne),
            "<" | "lt" => Ok(Self::Lt),
            "<=" | "lte" | "le" => Ok(Self::Lte),
            ">" | "gt" => Ok(Self::Gt),
            ">=" | "gte" | "ge" => Ok(Self::Gte),
            "contains" | "array-contains" => Ok(Self::Contains),
            _ => Err(ParseError::UnknownOperator {
                operator: s.to_string(),
            }),
        }
    }
}

/// A typed single-field predicate: `field operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Parses a combined condition such as `source==email` or
    /// `tags contains vip`.
    ///
    /// The input splits at the earliest operator token; when two tokens start
    /// at the same position the longer one wins, so `<=` is never read as
    /// `<`. Anything after the split, other operator tokens included, is
    /// part of the value.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when no operator is present or either side of
    /// it is empty.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let (operator, idx) = Operator::PARSE_ORDER
            .iter()
            .filter_map(|op| input.find(op.split_token()).map(|idx| (*op, idx)))
            .min_by_key(|(op, idx)| (*idx, Reverse(op.split_token().len())))
            .ok_or_else(|| ParseError::MissingOperator {
                input: input.to_string(),
            })?;

        let field = input[..idx].trim();
        let raw_value = input[idx + operator.split_token().len()..].trim();
        Self::from_raw(input, field, operator, raw_value)
    }

    /// Builds a condition from discrete `--field/--operator/--value` input.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for an unknown operator or empty parts.
    pub fn from_parts(field: &str, operator: &str, value: &str) -> Result<Self, ParseError> {
        let op: Operator = operator.parse()?;
        let display = format!("{field} {operator} {value}");
        Self::from_raw(&display, field.trim(), op, value.trim())
    }

    fn from_raw(
        input: &str,
        field: &str,
        operator: Operator,
        raw_value: &str,
    ) -> Result<Self, ParseError> {
        if field.is_empty() {
            return Err(ParseError::EmptyField {
                input: input.to_string(),
            });
        }
        if raw_value.is_empty() {
            return Err(ParseError::EmptyValue {
                input: input.to_string(),
            });
        }
        Ok(Self {
            field: field.to_string(),
            operator,
            value: coerce_value(raw_value, ValueHint::Infer)?,
        })
    }

    /// Evaluates the condition against a document. A missing field never
    /// matches, whatever the operator.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field)
            .is_some_and(|actual| self.evaluate(actual))
    }

    /// Evaluates the condition against a single field value.
    #[must_use]
    pub fn evaluate(&self, actual: &Value) -> bool {
        match self.operator {
            Operator::Eq => actual.loosely_eq(&self.value),
            Operator::Ne => !actual.loosely_eq(&self.value),
            Operator::Lt => actual.compare(&self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => actual.compare(&self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Contains => match actual {
                Value::Array(items) => items.iter().any(|item| item.loosely_eq(&self.value)),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Contains => write!(f, "{} contains {}", self.field, self.value),
            op => write!(f, "{}{}{}", self.field, op, self.value),
        }
    }
}

impl FromStr for Condition {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
