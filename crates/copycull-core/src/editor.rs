//! Row mutation on a staged sheet: culling rows and writing formulas.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use copycull_engine::engine::{
    Cell, CellValue, Combinator, FormulaSet, FormulaTemplate, PredicateSet, RowSelector,
    column_letters,
};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::{CopycullError, Result};
use crate::grid::{CellGrid, SheetGrid};
use crate::sheet::{BindingState, SheetBinding, shift_protected_rows_after_delete};

/// What a cull does with rows whose combined predicate outcome is true.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum CullMode {
    /// Delete rows where the outcome is true.
    #[default]
    DeleteMatching,
    /// Keep only rows where the outcome is true; delete the rest.
    KeepMatching,
}

impl CullMode {
    pub fn should_delete(self, outcome: bool) -> bool {
        match self {
            CullMode::DeleteMatching => outcome,
            CullMode::KeepMatching => !outcome,
        }
    }
}

impl FromStr for CullMode {
    type Err = CopycullError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" | "delete-matching" => Ok(CullMode::DeleteMatching),
            "keep" | "select" | "keep-matching" => Ok(CullMode::KeepMatching),
            _ => Err(CopycullError::InvalidCombinator(format!(
                "cull mode must be 'delete' or 'keep' (got {:?})",
                s
            ))),
        }
    }
}

impl TryFrom<String> for CullMode {
    type Error = CopycullError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for CullMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CullMode::DeleteMatching => f.write_str("delete"),
            CullMode::KeepMatching => f.write_str("keep"),
        }
    }
}

/// An editable handle on one staged sheet.
///
/// The editor owns nothing: it borrows the sheet's binding and, while the
/// workbook is open, its grid. Once the workbook is closed the grid is gone
/// and every cell-touching operation fails with
/// [`CopycullError::DetachedResource`].
pub struct SheetEditor<'a, G: CellGrid + ?Sized = SheetGrid> {
    binding: &'a mut SheetBinding,
    grid: Option<&'a mut G>,
}

impl<'a, G: CellGrid + ?Sized> SheetEditor<'a, G> {
    pub fn new(binding: &'a mut SheetBinding, grid: Option<&'a mut G>) -> Self {
        SheetEditor { binding, grid }
    }

    pub fn binding(&self) -> &SheetBinding {
        self.binding
    }

    pub fn sheet_name(&self) -> &str {
        &self.binding.sheet_name
    }

    pub fn header_row(&self) -> u32 {
        self.binding.header_row
    }

    pub fn protected_rows(&self) -> &BTreeSet<u32> {
        &self.binding.protected_rows
    }

    pub fn last_protected_rows(&self) -> &BTreeSet<u32> {
        &self.binding.last_protected_rows
    }

    pub fn is_loaded(&self) -> bool {
        self.grid.is_some() && self.binding.state != BindingState::Closed
    }

    /// Read-only access to the grid while the workbook is open.
    pub fn grid(&self) -> Result<&G> {
        match (&self.binding.state, self.grid.as_deref()) {
            (BindingState::Open(_), Some(grid)) => Ok(grid),
            _ => Err(CopycullError::DetachedResource),
        }
    }

    fn parts(&mut self) -> Result<(&mut SheetBinding, &mut G)> {
        if self.binding.state == BindingState::Closed {
            return Err(CopycullError::DetachedResource);
        }
        let grid = self
            .grid
            .as_deref_mut()
            .ok_or(CopycullError::DetachedResource)?;
        Ok((&mut *self.binding, grid))
    }

    /// Column position of the header labelled `name`.
    pub fn find_match_col(&self, name: &str) -> Result<u32> {
        self.grid()?;
        self.binding
            .column_index
            .get(name)
            .copied()
            .ok_or_else(|| CopycullError::UnknownColumn {
                column: name.to_string(),
                header_row: self.binding.header_row,
            })
    }

    /// Re-scan the header row. The column index is otherwise fixed at staging time.
    pub fn refresh_column_index(&mut self) -> Result<()> {
        let (binding, grid) = self.parts()?;
        binding.rescan_header(&*grid);
        Ok(())
    }

    /// Data rows (below the header, through the last populated row) that are not
    /// in `protected`, or in the sheet's own protected rows when `None`.
    pub fn modifiable_rows(&self, protected: Option<&BTreeSet<u32>>) -> Result<Vec<u32>> {
        let grid = self.grid()?;
        let protected = protected.unwrap_or(&self.binding.protected_rows);
        let header_row = self.binding.header_row;
        Ok((header_row.saturating_add(1)..=grid.last_populated_row())
            .filter(|&row| row > header_row && !protected.contains(&row))
            .collect())
    }

    /// Delete rows according to `predicates`, `combinator` and `mode`, using and
    /// updating the sheet's protected rows. Returns the number of rows removed.
    ///
    /// Rows are visited bottom-up so every deletion only shifts rows that were
    /// already visited. Protected rows and the header are never deleted.
    ///
    /// Not transactional: if a predicate fails part-way, rows deleted before the
    /// failure stay deleted and the protected rows reflect those deletions.
    pub fn cull(
        &mut self,
        predicates: &PredicateSet,
        combinator: Combinator,
        mode: CullMode,
    ) -> Result<usize> {
        let (binding, grid) = self.parts()?;
        let mut protected = std::mem::take(&mut binding.protected_rows);
        let outcome = cull_rows(binding, grid, predicates, combinator, mode, &mut protected);
        binding.last_protected_rows = protected.clone();
        binding.protected_rows = protected;
        outcome
    }

    /// Like [`SheetEditor::cull`], but protects `protected` for this call only.
    /// The reindexed set is recorded in `last_protected_rows`; the sheet's own
    /// protected rows are left untouched.
    pub fn cull_protecting(
        &mut self,
        predicates: &PredicateSet,
        combinator: Combinator,
        mode: CullMode,
        protected: &BTreeSet<u32>,
    ) -> Result<usize> {
        let (binding, grid) = self.parts()?;
        let mut protected = protected.clone();
        let outcome = cull_rows(binding, grid, predicates, combinator, mode, &mut protected);
        binding.last_protected_rows = protected;
        outcome
    }

    /// Write generated formulas. Returns the number of cells written.
    ///
    /// With `target_rows = None` every data row that is not protected gets a
    /// formula. An explicit `target_rows` list is used verbatim, protected rows
    /// included: explicit input overrides the protection that applies to the
    /// default row set. Row 0 is rejected with `InvalidRow` before any write.
    ///
    /// Not transactional: if a template fails, cells already written stay written.
    pub fn add_formulas(
        &mut self,
        formulas: &FormulaSet,
        target_rows: Option<&[u32]>,
    ) -> Result<usize> {
        let rows = match target_rows {
            Some(rows) => {
                if rows.contains(&0) {
                    return Err(CopycullError::InvalidRow(0));
                }
                let overlap: Vec<u32> = rows
                    .iter()
                    .copied()
                    .filter(|row| self.binding.protected_rows.contains(row))
                    .collect();
                if !overlap.is_empty() {
                    warn!(
                        "sheet {:?}: writing formulas into protected rows {:?} (explicit target rows)",
                        self.binding.sheet_name, overlap
                    );
                }
                rows.to_vec()
            }
            None if formulas.is_empty() => return Ok(0),
            None => self.modifiable_rows(None)?,
        };
        self.write_formulas(formulas, &rows)
    }

    /// Like [`SheetEditor::add_formulas`] over the default row set, but skips
    /// `protected` for this call instead of the sheet's own protected rows.
    pub fn add_formulas_protecting(
        &mut self,
        formulas: &FormulaSet,
        protected: &BTreeSet<u32>,
    ) -> Result<usize> {
        if formulas.is_empty() {
            return Ok(0);
        }
        let rows = self.modifiable_rows(Some(protected))?;
        self.write_formulas(formulas, &rows)
    }

    fn write_formulas(&mut self, formulas: &FormulaSet, rows: &[u32]) -> Result<usize> {
        if formulas.is_empty() {
            return Ok(0);
        }
        let (binding, grid) = self.parts()?;
        let mut written = 0;
        for &row in rows {
            for formula in formulas.iter() {
                let text = formula.template.render(row).map_err(|message| {
                    CopycullError::TemplateEvaluation {
                        row,
                        column: formula.letters(),
                        message,
                    }
                })?;
                let cell = Cell::new(CellValue::from_formula_text(&text))
                    .with_number_format(formula.number_format.clone());
                grid.write_cell(row, formula.column, cell);
                written += 1;
            }
        }
        info!(
            "sheet {:?}: wrote {} cells across {} rows into columns {:?}",
            binding.sheet_name,
            written,
            rows.len(),
            formulas.iter().map(|f| f.letters()).collect::<Vec<_>>()
        );
        Ok(written)
    }
}

fn cull_rows<G: CellGrid + ?Sized>(
    binding: &SheetBinding,
    grid: &mut G,
    predicates: &PredicateSet,
    combinator: Combinator,
    mode: CullMode,
    protected: &mut BTreeSet<u32>,
) -> Result<usize> {
    if predicates.is_empty() {
        return Err(CopycullError::InvalidCombinator(
            "empty predicate set".to_string(),
        ));
    }

    // Resolve every column before touching any row.
    let mut columns: HashMap<&str, u32> = HashMap::with_capacity(predicates.len());
    for name in predicates.columns() {
        let col = binding.column_index.get(name).copied().ok_or_else(|| {
            CopycullError::UnknownColumn {
                column: name.to_string(),
                header_row: binding.header_row,
            }
        })?;
        columns.insert(name, col);
    }

    let first = binding.header_row.saturating_add(1);
    let last = grid.last_populated_row();
    let mut removed = 0;
    for row in (first..=last).rev() {
        if row <= binding.header_row || protected.contains(&row) {
            continue;
        }
        let outcome = RowSelector::evaluate_with(
            |name| columns.get(name).map(|&col| grid.read_cell(row, col)),
            predicates,
            combinator,
        )
        .map_err(|e| CopycullError::from(e).at_row(row, binding.header_row))?;

        if mode.should_delete(outcome) {
            grid.delete_row(row);
            shift_protected_rows_after_delete(protected, row);
            removed += 1;
            debug!("sheet {:?}: deleted row {}", binding.sheet_name, row);
        }
    }

    info!(
        "sheet {:?}: culled {} rows ({} {}, mode {})",
        binding.sheet_name,
        removed,
        predicates.len(),
        if predicates.len() == 1 { "condition" } else { "conditions" },
        mode
    );
    if removed > 0 {
        debug!(
            "sheet {:?}: protected rows now {:?} (columns {})",
            binding.sheet_name,
            protected,
            columns
                .values()
                .map(|&c| column_letters(c))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(removed)
}
