//! Row selection: evaluate a predicate set against one row and reduce the
//! per-column outcomes with a [`Combinator`].
//!
//! Selection is a pure function of the row data, the predicates and the
//! combinator. It keeps no state and never touches a grid.

use std::collections::HashMap;

use super::combinator::Combinator;
use super::predicate::PredicateSet;
use super::value::CellValue;
use crate::error::{EngineError, Result};

pub struct RowSelector;

impl RowSelector {
    /// Evaluate `predicates` against a row given as column name -> value.
    ///
    /// A predicate keyed on a column that is absent from `row_values` fails with
    /// [`EngineError::UnknownColumn`]. An empty predicate set fails with
    /// [`EngineError::InvalidCombinator`].
    pub fn evaluate(
        row_values: &HashMap<String, CellValue>,
        predicates: &PredicateSet,
        combinator: Combinator,
    ) -> Result<bool> {
        Self::evaluate_with(|column| row_values.get(column).cloned(), predicates, combinator)
    }

    /// Like [`RowSelector::evaluate`], but pulls each value on demand from `lookup`.
    pub fn evaluate_with<F>(
        mut lookup: F,
        predicates: &PredicateSet,
        combinator: Combinator,
    ) -> Result<bool>
    where
        F: FnMut(&str) -> Option<CellValue>,
    {
        if predicates.is_empty() {
            return Err(EngineError::InvalidCombinator(
                "empty predicate set".to_string(),
            ));
        }

        let mut outcomes = Vec::with_capacity(predicates.len());
        for (column, predicate) in predicates.iter() {
            let value =
                lookup(column).ok_or_else(|| EngineError::UnknownColumn(column.to_string()))?;
            let outcome = predicate
                .test(&value)
                .map_err(|message| EngineError::Predicate {
                    column: column.to_string(),
                    message,
                })?;
            outcomes.push(outcome);
        }

        combinator.reduce(outcomes)
    }
}
