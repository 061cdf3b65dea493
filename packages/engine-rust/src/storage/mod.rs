//! Document store boundary for the sweep engine.
//!
//! Provides the error taxonomy and index catalog shared by every
//! [`DocumentStore`](crate::DocumentStore) implementation:
//!
//! - [`StoreError`]: recoverable missing-index failures versus store access
//!   failures
//! - [`IndexCatalog`]: which `(collection, field)` composite indexes exist
//!   next to the always-indexed range field
//! - [`engines`]: the in-memory and `redb` implementations

pub mod engines;
pub mod error;
pub mod index;

pub use engines::*;
pub use error::*;
pub use index::*;
