//! Staged sheet state: header location, column index and protected rows.

use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};

use crate::error::{CopycullError, Result};
use crate::grid::CellGrid;

/// Position of a sheet in its workbook's sheet arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SheetId(pub usize);

/// Lifecycle of a staged sheet. Operations that touch cells need `Open`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingState {
    Open(SheetId),
    Closed,
}

/// Options for staging a sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageOptions {
    /// Row holding the column labels (1-based).
    pub header_row: u32,
    /// First row that may be deleted or overwritten; defaults to the row after the header.
    pub first_modifiable_row: Option<u32>,
    /// Rows that must never be deleted or overwritten, in addition to the automatic ones.
    pub protected_rows: BTreeSet<u32>,
    /// Rename the sheet once staged.
    pub rename: Option<String>,
}

impl Default for StageOptions {
    fn default() -> Self {
        StageOptions {
            header_row: 1,
            first_modifiable_row: None,
            protected_rows: BTreeSet::new(),
            rename: None,
        }
    }
}

impl StageOptions {
    pub fn with_header_row(mut self, header_row: u32) -> Self {
        self.header_row = header_row;
        self
    }

    pub fn with_first_modifiable_row(mut self, row: u32) -> Self {
        self.first_modifiable_row = Some(row);
        self
    }

    pub fn with_protected_rows(mut self, rows: impl IntoIterator<Item = u32>) -> Self {
        self.protected_rows.extend(rows);
        self
    }

    pub fn with_rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    /// Explicit rows plus every row before the first modifiable one, plus the header.
    /// Leading rows are only listed up to `last_row`; rows past the end of the
    /// sheet are never candidates for deletion or formulas.
    pub fn resolve_protected_rows(&self, last_row: u32) -> BTreeSet<u32> {
        let first_modifiable = self
            .first_modifiable_row
            .filter(|&row| row > 0)
            .unwrap_or(self.header_row.saturating_add(1))
            .min(last_row.saturating_add(1));
        let mut protected = self.protected_rows.clone();
        protected.extend(1..first_modifiable);
        protected.insert(self.header_row);
        protected
    }
}

/// Everything a staged sheet knows about itself, independent of the grid.
#[derive(Clone, Debug)]
pub struct SheetBinding {
    pub(crate) sheet_name: String,
    pub(crate) state: BindingState,
    pub(crate) header_row: u32,
    pub(crate) column_index: HashMap<String, u32>,
    pub(crate) protected_rows: BTreeSet<u32>,
    pub(crate) last_protected_rows: BTreeSet<u32>,
}

impl SheetBinding {
    /// Stage `sheet_name`: scan its header row and lock down the protected rows.
    pub fn stage<G: CellGrid + ?Sized>(
        sheet_name: &str,
        id: SheetId,
        grid: &G,
        options: &StageOptions,
    ) -> Result<SheetBinding> {
        if options.header_row == 0 {
            return Err(CopycullError::InvalidHeaderRow(0));
        }
        let protected_rows = options.resolve_protected_rows(grid.last_populated_row());
        let column_index = scan_header(sheet_name, grid, options.header_row);
        debug!(
            "staged {:?}: header row {}, {} columns, protected {:?}",
            sheet_name,
            options.header_row,
            column_index.len(),
            protected_rows
        );
        Ok(SheetBinding {
            sheet_name: sheet_name.to_string(),
            state: BindingState::Open(id),
            header_row: options.header_row,
            column_index,
            last_protected_rows: protected_rows.clone(),
            protected_rows,
        })
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, BindingState::Open(_))
    }

    pub fn header_row(&self) -> u32 {
        self.header_row
    }

    pub fn column_index(&self) -> &HashMap<String, u32> {
        &self.column_index
    }

    pub fn protected_rows(&self) -> &BTreeSet<u32> {
        &self.protected_rows
    }

    /// Protected rows as they stood after the most recent cull.
    pub fn last_protected_rows(&self) -> &BTreeSet<u32> {
        &self.last_protected_rows
    }

    /// Re-derive the protected rows after `deleted_row` was removed from the grid.
    pub fn shift_protected_rows_after_delete(&mut self, deleted_row: u32) {
        shift_protected_rows_after_delete(&mut self.protected_rows, deleted_row);
    }

    pub(crate) fn rescan_header<G: CellGrid + ?Sized>(&mut self, grid: &G) {
        self.column_index = scan_header(&self.sheet_name, grid, self.header_row);
    }

    pub(crate) fn attach(&mut self, id: SheetId) {
        self.state = BindingState::Open(id);
    }

    pub(crate) fn detach(&mut self) {
        self.state = BindingState::Closed;
    }
}

fn scan_header<G: CellGrid + ?Sized>(
    sheet_name: &str,
    grid: &G,
    header_row: u32,
) -> HashMap<String, u32> {
    let mut index = HashMap::new();
    for (col, label) in grid.header_text(header_row) {
        if index.contains_key(&label) {
            warn!(
                "sheet {:?}: duplicate header {:?} in row {}; using the first match",
                sheet_name, label, header_row
            );
            continue;
        }
        index.insert(label, col);
    }
    index
}

/// Keep `protected` pointing at the same logical rows after `deleted_row` is removed:
/// the deleted row drops out and every row below it moves up by one.
pub fn shift_protected_rows_after_delete(protected: &mut BTreeSet<u32>, deleted_row: u32) {
    let below = match deleted_row.checked_add(1) {
        Some(next) => protected.split_off(&next),
        None => BTreeSet::new(),
    };
    protected.remove(&deleted_row);
    protected.extend(below.into_iter().map(|row| row - 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SheetGrid;

    fn set(rows: &[u32]) -> BTreeSet<u32> {
        rows.iter().copied().collect()
    }

    #[test]
    fn test_shift_decrements_rows_below_only() {
        let mut protected = set(&[1, 3, 8]);
        shift_protected_rows_after_delete(&mut protected, 6);
        assert_eq!(protected, set(&[1, 3, 7]));
        shift_protected_rows_after_delete(&mut protected, 2);
        assert_eq!(protected, set(&[1, 2, 6]));
    }

    #[test]
    fn test_shift_drops_deleted_row() {
        let mut protected = set(&[2, 4, 5]);
        shift_protected_rows_after_delete(&mut protected, 4);
        assert_eq!(protected, set(&[2, 4]));
    }

    #[test]
    fn test_shift_tracks_logical_rows_through_several_deletes() {
        // Rows 1..=10, protected {3, 8}; delete 6, 4, 2 (descending, as cull does).
        let mut protected = set(&[3, 8]);
        for row in [6, 4, 2] {
            shift_protected_rows_after_delete(&mut protected, row);
        }
        assert_eq!(protected, set(&[2, 5]));
    }

    #[test]
    fn test_resolve_protected_rows_defaults() {
        let options = StageOptions::default().with_header_row(3);
        assert_eq!(options.resolve_protected_rows(20), set(&[1, 2, 3]));

        let options = StageOptions::default()
            .with_first_modifiable_row(4)
            .with_protected_rows([9]);
        assert_eq!(options.resolve_protected_rows(20), set(&[1, 2, 3, 9]));
    }

    #[test]
    fn test_resolve_protected_rows_stops_at_last_row() {
        let options = StageOptions::default().with_first_modifiable_row(u32::MAX);
        assert_eq!(options.resolve_protected_rows(4), set(&[1, 2, 3, 4]));

        let options = StageOptions::default().with_header_row(u32::MAX);
        assert_eq!(options.resolve_protected_rows(2), set(&[1, 2, u32::MAX]));
    }

    #[test]
    fn test_shift_at_last_possible_row() {
        let mut protected = set(&[1, u32::MAX]);
        shift_protected_rows_after_delete(&mut protected, u32::MAX);
        assert_eq!(protected, set(&[1]));
    }

    #[test]
    fn test_stage_builds_column_index_first_match_wins() {
        let mut grid = SheetGrid::new();
        grid.write_input(1, 1, "Team");
        grid.write_input(1, 2, "Price");
        grid.write_input(1, 3, "Team");
        let binding =
            SheetBinding::stage("Sheet1", SheetId(0), &grid, &StageOptions::default()).unwrap();
        assert_eq!(binding.column_index().get("Team"), Some(&1));
        assert_eq!(binding.column_index().get("Price"), Some(&2));
        assert_eq!(binding.column_index().len(), 2);
        assert!(binding.is_loaded());
    }

    #[test]
    fn test_stage_rejects_row_zero() {
        let grid = SheetGrid::new();
        let options = StageOptions::default().with_header_row(0);
        assert!(matches!(
            SheetBinding::stage("S", SheetId(0), &grid, &options),
            Err(CopycullError::InvalidHeaderRow(0))
        ));
    }
}
