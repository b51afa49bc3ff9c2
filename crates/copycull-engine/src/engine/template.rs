//! Formula templates: functions from a row number to the text written into
//! one column of that row.
//!
//! Generated text is never validated or evaluated. A leading `=` makes it a
//! formula when written; anything else lands as literal text.

use super::address::{column_index, column_letters};
use super::value::GENERAL_FORMAT;
use crate::error::{EngineError, Result};

/// Produces the content for one column of a given (1-based) row.
pub trait FormulaTemplate {
    fn render(&self, row: u32) -> std::result::Result<String, String>;
}

impl<F> FormulaTemplate for F
where
    F: Fn(u32) -> String,
{
    fn render(&self, row: u32) -> std::result::Result<String, String> {
        Ok(self(row))
    }
}

/// A template that substitutes every `{row}` in a pattern, e.g. `=C{row}*E{row}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternTemplate {
    pattern: String,
}

impl PatternTemplate {
    pub const PLACEHOLDER: &'static str = "{row}";

    pub fn new(pattern: impl Into<String>) -> Self {
        PatternTemplate {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl FormulaTemplate for PatternTemplate {
    fn render(&self, row: u32) -> std::result::Result<String, String> {
        Ok(self.pattern.replace(Self::PLACEHOLDER, &row.to_string()))
    }
}

/// One target column of a [`FormulaSet`].
pub struct FormulaColumn {
    /// 1-based column position.
    pub column: u32,
    pub template: Box<dyn FormulaTemplate>,
    pub number_format: String,
}

impl FormulaColumn {
    pub fn letters(&self) -> String {
        column_letters(self.column)
    }
}

/// Column-letter to template mapping, kept in insertion order.
#[derive(Default)]
pub struct FormulaSet {
    columns: Vec<FormulaColumn>,
}

impl FormulaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FormulaSet::insert`].
    pub fn with(
        mut self,
        column: &str,
        template: impl FormulaTemplate + 'static,
    ) -> Result<Self> {
        self.insert(column, template)?;
        Ok(self)
    }

    /// Register `template` for the column with letters `column` (e.g. "G").
    /// Replaces any template already registered for that column.
    pub fn insert(&mut self, column: &str, template: impl FormulaTemplate + 'static) -> Result<()> {
        self.insert_boxed(column, Box::new(template))
    }

    pub fn insert_boxed(&mut self, column: &str, template: Box<dyn FormulaTemplate>) -> Result<()> {
        let col = parse_column(column)?;
        match self.columns.iter_mut().find(|c| c.column == col) {
            Some(existing) => existing.template = template,
            None => self.columns.push(FormulaColumn {
                column: col,
                template,
                number_format: GENERAL_FORMAT.to_string(),
            }),
        }
        Ok(())
    }

    /// Set the number format written with a registered column's formulas.
    pub fn set_number_format(&mut self, column: &str, format: impl Into<String>) -> Result<()> {
        let col = parse_column(column)?;
        let entry = self
            .columns
            .iter_mut()
            .find(|c| c.column == col)
            .ok_or_else(|| EngineError::UnknownColumn(column.to_string()))?;
        entry.number_format = format.into();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormulaColumn> {
        self.columns.iter()
    }
}

impl std::fmt::Debug for FormulaSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.columns.iter().map(|c| c.letters()))
            .finish()
    }
}

fn parse_column(column: &str) -> Result<u32> {
    column_index(column.trim()).ok_or_else(|| EngineError::UnknownColumn(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_template_substitutes_every_placeholder() {
        let t = PatternTemplate::new("=F{row}*AB{row}/$S$1");
        assert_eq!(t.render(5).unwrap(), "=F5*AB5/$S$1");
    }

    #[test]
    fn test_closure_template() {
        let t = |r: u32| format!("=A{r}+B{r}");
        assert_eq!(t.render(2).unwrap(), "=A2+B2");
    }

    #[test]
    fn test_insert_validates_letters_and_replaces() {
        let mut set = FormulaSet::new();
        set.insert("g", PatternTemplate::new("=1")).unwrap();
        set.insert("G", PatternTemplate::new("=2")).unwrap();
        assert_eq!(set.len(), 1);
        let col = set.iter().next().unwrap();
        assert_eq!(col.column, 7);
        assert_eq!(col.number_format, GENERAL_FORMAT);
        assert_eq!(col.template.render(1).unwrap(), "=2");

        assert!(matches!(
            set.insert("G1", PatternTemplate::new("=3")),
            Err(EngineError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_number_format_requires_registered_column() {
        let mut set = FormulaSet::new()
            .with("R", PatternTemplate::new("=AB{row}*AC{row}"))
            .unwrap();
        set.set_number_format("R", "#,##0.00").unwrap();
        assert_eq!(set.iter().next().unwrap().number_format, "#,##0.00");
        assert!(set.set_number_format("S", "0%").is_err());
    }
}
