//! Column predicates.
//!
//! A predicate is anything that can look at one cell value and answer yes or
//! no. Plain closures over [`CellValue`] qualify; scripted predicates live in
//! [`crate::script`].

use super::value::CellValue;

/// A single-argument test applied to the value under one column.
pub trait Predicate {
    /// Returns the predicate outcome, or a message if the predicate itself failed.
    fn test(&self, value: &CellValue) -> Result<bool, String>;
}

impl<F> Predicate for F
where
    F: Fn(&CellValue) -> bool,
{
    fn test(&self, value: &CellValue) -> Result<bool, String> {
        Ok(self(value))
    }
}

/// Column-name to predicate mapping, kept in insertion order.
///
/// Column names are case-sensitive; inserting a name twice replaces the earlier predicate.
#[derive(Default)]
pub struct PredicateSet {
    entries: Vec<(String, Box<dyn Predicate>)>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PredicateSet::insert`].
    pub fn with(mut self, column: impl Into<String>, predicate: impl Predicate + 'static) -> Self {
        self.insert(column, predicate);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, predicate: impl Predicate + 'static) {
        self.insert_boxed(column.into(), Box::new(predicate));
    }

    pub fn insert_boxed(&mut self, column: String, predicate: Box<dyn Predicate>) {
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = predicate,
            None => self.entries.push((column, predicate)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Predicate)> {
        self.entries
            .iter()
            .map(|(name, predicate)| (name.as_str(), predicate.as_ref()))
    }
}

impl std::fmt::Debug for PredicateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.columns()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_column() {
        let mut set = PredicateSet::new()
            .with("Price", |v: &CellValue| v.as_number().is_some_and(|n| n > 10.0))
            .with("Team", |_: &CellValue| true);
        set.insert("Price", |_: &CellValue| false);

        assert_eq!(set.len(), 2);
        assert_eq!(set.columns().collect::<Vec<_>>(), vec!["Price", "Team"]);
        let (_, price) = set.iter().next().unwrap();
        assert_eq!(price.test(&CellValue::Number(50.0)), Ok(false));
    }
}
