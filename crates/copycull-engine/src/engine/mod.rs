//! Row-selection engine API.
//!
//! - [`Cell`], [`CellValue`] - Data structures for cell content
//! - [`CellAddr`], [`column_index`], [`column_letters`] - A1 notation ↔ 1-based positions
//! - [`Combinator`] - AND / OR / XOR reduction of per-column outcomes
//! - [`Predicate`], [`PredicateSet`] - Per-column tests
//! - [`RowSelector`] - Evaluate a predicate set against one row
//! - [`FormulaTemplate`], [`FormulaSet`] - Row number → formula text

mod address;
mod combinator;
mod predicate;
mod selector;
mod template;
mod value;

pub use address::{CellAddr, column_index, column_letters};
pub use combinator::Combinator;
pub use predicate::{Predicate, PredicateSet};
pub use selector::RowSelector;
pub use template::{FormulaColumn, FormulaSet, FormulaTemplate, PatternTemplate};
pub use value::{Cell, CellValue, GENERAL_FORMAT};
