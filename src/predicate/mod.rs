//! Visibility predicates.
//!
//! A field's `visibleWhen` expression is compiled once, when the schema is
//! loaded, into a [`Predicate`] that is later evaluated against the whole
//! record. The query language sits behind [`PredicateLanguage`] so the
//! visibility evaluator never depends on a concrete syntax.

mod jsonpath;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use jsonpath::{JsonPath, JsonPathLanguage, JsonPathPredicate};

pub trait Predicate: fmt::Debug + Send + Sync {
    /// Returns `true` when the field guarded by this predicate is visible.
    fn evaluate(&self, record: &Value) -> bool;

    /// The expression the predicate was compiled from.
    fn source(&self) -> &str;
}

pub trait PredicateLanguage: fmt::Debug + Send + Sync {
    fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, PredicateError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at offset {position})")]
pub struct PredicateError {
    pub position: usize,
    pub message: String,
}

impl PredicateError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}
