//! Cell data structures for a staged sheet.
//!
//! - [`CellValue`] - The typed content of a cell (empty, number, text, boolean or formula)
//! - [`Cell`] - A cell value plus the number format it is displayed with

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number format written alongside generated formulas unless a column asks for another.
pub const GENERAL_FORMAT: &str = "General";

/// The typed content of a cell.
///
/// Formula text is stored without its leading `=`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Formula(String),
}

impl CellValue {
    /// Parse user input and create the appropriate value.
    /// - Empty string or whitespace -> Empty
    /// - Starts with '=' -> Formula (without the '=')
    /// - Quoted string -> Text (without quotes)
    /// - TRUE / FALSE (any case) -> Bool
    /// - Valid number -> Number
    /// - Otherwise -> Text
    pub fn from_input(input: &str) -> CellValue {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Some(formula) = trimmed.strip_prefix('=') {
            return CellValue::Formula(formula.to_string());
        }

        if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
            return CellValue::Text(trimmed[1..trimmed.len() - 1].to_string());
        }

        if let Some(b) = parse_bool(trimmed) {
            return CellValue::Bool(b);
        }

        if let Ok(n) = trimmed.parse::<f64>() {
            return CellValue::Number(n);
        }

        CellValue::Text(trimmed.to_string())
    }

    /// Interpret generated text the way a spreadsheet does on write:
    /// a leading `=` marks a formula, anything else is literal text kept verbatim.
    pub fn from_formula_text(text: &str) -> CellValue {
        match text.strip_prefix('=') {
            Some(formula) => CellValue::Formula(formula.to_string()),
            None if text.is_empty() => CellValue::Empty,
            None => CellValue::Text(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text used when this value acts as a header label.
    pub fn label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            other => Some(other.to_input_string()),
        }
    }

    /// Get a display string for the cell content (for editing).
    pub fn to_input_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Formula(f) => format!("={}", f),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_input_string())
    }
}

pub(crate) fn parse_bool(input: &str) -> Option<bool> {
    if input.eq_ignore_ascii_case("true") {
        Some(true)
    } else if input.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// A cell in a sheet grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    /// Display format code, `None` when the cell keeps the sheet default.
    pub number_format: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Cell {
        Cell {
            value,
            number_format: None,
        }
    }

    pub fn new_empty() -> Cell {
        Cell::new(CellValue::Empty)
    }

    pub fn new_text(text: &str) -> Cell {
        Cell::new(CellValue::Text(text.to_string()))
    }

    pub fn new_number(n: f64) -> Cell {
        Cell::new(CellValue::Number(n))
    }

    pub fn new_bool(b: bool) -> Cell {
        Cell::new(CellValue::Bool(b))
    }

    /// Create a formula cell. `formula` is stored without a leading '='.
    pub fn new_formula(formula: &str) -> Cell {
        Cell::new(CellValue::Formula(formula.to_string()))
    }

    pub fn from_input(input: &str) -> Cell {
        Cell::new(CellValue::from_input(input))
    }

    pub fn with_number_format(mut self, format: impl Into<String>) -> Cell {
        self.number_format = Some(format.into());
        self
    }
}

impl From<CellValue> for Cell {
    fn from(value: CellValue) -> Self {
        Cell::new(value)
    }
}
