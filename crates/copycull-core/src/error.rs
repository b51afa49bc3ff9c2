//! Error types for copycull core.

use copycull_engine::EngineError;
use thiserror::Error;

/// Errors that can occur while staging, culling or persisting a workbook.
///
/// None of the mutating operations roll back: when `cull` or `add_formulas`
/// fails part-way, rows already deleted stay deleted and cells already
/// written stay written.
#[derive(Error, Debug)]
pub enum CopycullError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Could not find column {column:?} in header row {header_row}")]
    UnknownColumn { column: String, header_row: u32 },

    #[error("Worksheet {0:?} does not exist or has not been staged")]
    UnknownSheet(String),

    #[error("Worksheet {0:?} already exists")]
    DuplicateSheet(String),

    #[error("Workbook is not currently open")]
    DetachedResource,

    #[error("Workbook is currently open; save and close it before retargeting the copy")]
    WorkbookOpen,

    #[error("Copy target {0:?} is the source workbook itself")]
    SamePath(std::path::PathBuf),

    #[error("Invalid combinator: {0}")]
    InvalidCombinator(String),

    #[error("Header row must be 1 or greater (got {0})")]
    InvalidHeaderRow(u32),

    #[error("Target row must be 1 or greater (got {0})")]
    InvalidRow(u32),

    #[error("Predicate for column {column:?} failed at row {row}: {message}")]
    PredicateEvaluation {
        row: u32,
        column: String,
        message: String,
    },

    #[error("Formula template for column {column} failed at row {row}: {message}")]
    TemplateEvaluation {
        row: u32,
        column: String,
        message: String,
    },

    #[error("Script error: {0}")]
    Script(String),

    #[error("CSV file is empty")]
    EmptyCsv,
}

impl From<EngineError> for CopycullError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownColumn(column) => CopycullError::UnknownColumn {
                column,
                header_row: 0,
            },
            EngineError::InvalidCombinator(message) => CopycullError::InvalidCombinator(message),
            EngineError::Predicate { column, message } => CopycullError::PredicateEvaluation {
                row: 0,
                column,
                message,
            },
            EngineError::ScriptCompile(message) => CopycullError::Script(message),
        }
    }
}

impl CopycullError {
    /// Attach the row (and header row) a selection error happened at.
    pub(crate) fn at_row(self, row: u32, header_row: u32) -> Self {
        match self {
            CopycullError::UnknownColumn { column, .. } => {
                CopycullError::UnknownColumn { column, header_row }
            }
            CopycullError::PredicateEvaluation {
                column, message, ..
            } => CopycullError::PredicateEvaluation {
                row,
                column,
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CopycullError>;
