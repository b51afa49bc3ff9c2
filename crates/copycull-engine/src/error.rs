//! Error types for the copycull engine.

use thiserror::Error;

/// Errors raised while selecting rows or rendering formula templates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unknown column: {0:?}")]
    UnknownColumn(String),

    #[error("Invalid combinator: {0}")]
    InvalidCombinator(String),

    #[error("Predicate for column {column:?} failed: {message}")]
    Predicate { column: String, message: String },

    #[error("Script compile error: {0}")]
    ScriptCompile(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
