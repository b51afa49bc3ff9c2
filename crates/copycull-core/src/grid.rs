//! The cell grid capability consumed by sheet editors, and its sparse
//! in-memory implementation.

use copycull_engine::engine::{Cell, CellAddr, CellValue};
use dashmap::DashMap;

/// Row/column addressable storage for one sheet. Rows and columns are 1-based.
pub trait CellGrid {
    /// Value at (row, col); `CellValue::Empty` when nothing is stored there.
    fn read_cell(&self, row: u32, col: u32) -> CellValue;

    /// Overwrite the cell at (row, col).
    fn write_cell(&mut self, row: u32, col: u32, cell: Cell);

    /// Non-empty cells of `row` as (column, label) pairs, ordered by column.
    fn header_text(&self, row: u32) -> Vec<(u32, String)>;

    /// Remove `row` and shift every row below it up by one.
    fn delete_row(&mut self, row: u32);

    /// Highest row holding a non-empty cell, or 0 for an empty grid.
    fn last_populated_row(&self) -> u32;

    /// Write user-style input; a leading `=` marks formula text.
    fn write_input(&mut self, row: u32, col: u32, input: &str) {
        self.write_cell(row, col, Cell::from_input(input));
    }
}

/// Sparse grid storage backed by a `DashMap`.
///
/// Row deletion moves cells but never rewrites formula text, so formulas that
/// point below a deleted row keep their old references.
#[derive(Debug, Default)]
pub struct SheetGrid {
    cells: DashMap<CellAddr, Cell>,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from (address, cell) pairs; empty cells are dropped.
    pub fn from_cells(cells: impl IntoIterator<Item = (CellAddr, Cell)>) -> Self {
        let grid = SheetGrid::new();
        for (addr, cell) in cells {
            if !cell.value.is_empty() {
                grid.cells.insert(addr, cell);
            }
        }
        grid
    }

    pub fn get(&self, addr: &CellAddr) -> Option<Cell> {
        self.cells.get(addr).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Highest column holding a non-empty cell, or 0 for an empty grid.
    pub fn last_populated_col(&self) -> u32 {
        self.cells.iter().map(|entry| entry.key().col).max().unwrap_or(0)
    }

    /// All cells sorted by row, then column.
    pub fn sorted_cells(&self) -> Vec<(CellAddr, Cell)> {
        let mut cells: Vec<(CellAddr, Cell)> = self
            .cells
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        cells.sort_by(|a, b| a.0.row.cmp(&b.0.row).then(a.0.col.cmp(&b.0.col)));
        cells
    }
}

impl Clone for SheetGrid {
    fn clone(&self) -> Self {
        SheetGrid::from_cells(self.sorted_cells())
    }
}

impl CellGrid for SheetGrid {
    fn read_cell(&self, row: u32, col: u32) -> CellValue {
        self.cells
            .get(&CellAddr::new(col, row))
            .map(|entry| entry.value().value.clone())
            .unwrap_or(CellValue::Empty)
    }

    fn write_cell(&mut self, row: u32, col: u32, cell: Cell) {
        let addr = CellAddr::new(col, row);
        if cell.value.is_empty() && cell.number_format.is_none() {
            self.cells.remove(&addr);
        } else {
            self.cells.insert(addr, cell);
        }
    }

    fn header_text(&self, row: u32) -> Vec<(u32, String)> {
        let mut labels: Vec<(u32, String)> = self
            .cells
            .iter()
            .filter(|entry| entry.key().row == row)
            .filter_map(|entry| entry.value().value.label().map(|label| (entry.key().col, label)))
            .collect();
        labels.sort_by_key(|(col, _)| *col);
        labels
    }

    fn delete_row(&mut self, row: u32) {
        // Drop the deleted row
        let doomed: Vec<CellAddr> = self
            .cells
            .iter()
            .filter(|entry| entry.key().row == row)
            .map(|entry| *entry.key())
            .collect();
        for addr in doomed {
            self.cells.remove(&addr);
        }

        // Collect cells below the deleted row, then reinsert them one row up
        let to_move: Vec<(CellAddr, Cell)> = self
            .cells
            .iter()
            .filter(|entry| entry.key().row > row)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        for (addr, _) in &to_move {
            self.cells.remove(addr);
        }
        for (addr, cell) in to_move {
            self.cells.insert(CellAddr::new(addr.col, addr.row - 1), cell);
        }
    }

    fn last_populated_row(&self) -> u32 {
        self.cells
            .iter()
            .filter(|entry| !entry.value().value.is_empty())
            .map(|entry| entry.key().row)
            .max()
            .unwrap_or(0)
    }
}
