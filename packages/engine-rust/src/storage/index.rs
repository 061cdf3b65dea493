//! Composite index catalog.
//!
//! The range field is always indexed on its own. Filtering on any other
//! field together with the range needs a composite `(range field, field)`
//! index, declared per collection. Stores consult the catalog before
//! serving a compound query and fail with
//! [`StoreError::IndexUnavailable`] when the pair is missing.

use std::collections::HashSet;

use sweep_core::StoreQuery;

use super::error::StoreError;

/// An index declaration that is not `<collection>:<field>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid index `{spec}`: expected <collection>:<field>")]
pub struct IndexSpecError {
    pub spec: String,
}

/// Set of composite indexes available alongside the range field.
#[derive(Debug, Clone, Default)]
pub struct IndexCatalog {
    composites: HashSet<(String, String)>,
}

impl IndexCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style declaration of a composite index.
    #[must_use]
    pub fn with(mut self, collection: &str, field: &str) -> Self {
        self.insert(collection, field);
        self
    }

    pub fn insert(&mut self, collection: &str, field: &str) {
        self.composites
            .insert((collection.to_string(), field.to_string()));
    }

    /// Parses `collection:field` declarations, as given on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`IndexSpecError`] for the first malformed declaration.
    pub fn from_specs<I, S>(specs: I) -> Result<Self, IndexSpecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::new();
        for spec in specs {
            let spec = spec.as_ref().trim();
            if spec.is_empty() {
                continue;
            }
            match spec.split_once(':') {
                Some((collection, field))
                    if !collection.trim().is_empty() && !field.trim().is_empty() =>
                {
                    catalog.insert(collection.trim(), field.trim());
                }
                _ => {
                    return Err(IndexSpecError {
                        spec: spec.to_string(),
                    })
                }
            }
        }
        Ok(catalog)
    }

    /// Whether `collection` has a composite index covering `field`.
    #[must_use]
    pub fn has(&self, collection: &str, field: &str) -> bool {
        self.composites
            .contains(&(collection.to_string(), field.to_string()))
    }

    /// Number of declared composite indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.composites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.composites.is_empty()
    }

    /// Checks that the store can serve `query` from its indexes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IndexUnavailable`] for a compound query whose
    /// extra field has no composite index in this collection.
    pub fn check(&self, query: &StoreQuery) -> Result<(), StoreError> {
        let fields = query.indexed_fields();
        match fields.as_slice() {
            [_range] => Ok(()),
            [_range, extra] if self.has(&query.collection, extra) => Ok(()),
            _ => Err(StoreError::IndexUnavailable {
                collection: query.collection.clone(),
                fields: fields.iter().map(ToString::to_string).collect(),
                hint: fields
                    .get(1)
                    .map(|field| format!("declare it with --index {}:{field}", query.collection)),
            }),
        }
    }
}
