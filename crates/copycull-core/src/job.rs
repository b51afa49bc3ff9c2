//! One-shot copy, stage, cull and fill.

use std::path::PathBuf;

use copycull_engine::engine::{Combinator, FormulaSet, PredicateSet};
use log::info;

use crate::editor::CullMode;
use crate::error::Result;
use crate::sheet::StageOptions;
use crate::workbook::Workbook;

/// Everything needed to produce one culled copy of a sheet.
#[derive(Debug)]
pub struct CopyCullJob {
    pub source: PathBuf,
    /// File name of the copy, joined onto `copy_to_dir`.
    pub output_filename: PathBuf,
    /// Directory for the copy; the source's directory when `None`.
    pub copy_to_dir: Option<PathBuf>,
    pub sheet: String,
    pub options: StageOptions,
    /// When empty, no rows are culled.
    pub predicates: PredicateSet,
    pub combinator: Combinator,
    pub mode: CullMode,
    pub formulas: FormulaSet,
    pub target_rows: Option<Vec<u32>>,
}

impl CopyCullJob {
    pub fn new(
        source: impl Into<PathBuf>,
        output_filename: impl Into<PathBuf>,
        sheet: impl Into<String>,
    ) -> Self {
        CopyCullJob {
            source: source.into(),
            output_filename: output_filename.into(),
            copy_to_dir: None,
            sheet: sheet.into(),
            options: StageOptions::default(),
            predicates: PredicateSet::new(),
            combinator: Combinator::And,
            mode: CullMode::DeleteMatching,
            formulas: FormulaSet::new(),
            target_rows: None,
        }
    }

    pub fn with_copy_to_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.copy_to_dir = Some(dir.into());
        self
    }

    pub fn with_options(mut self, options: StageOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_predicates(mut self, predicates: PredicateSet, combinator: Combinator) -> Self {
        self.predicates = predicates;
        self.combinator = combinator;
        self
    }

    pub fn with_mode(mut self, mode: CullMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_formulas(mut self, formulas: FormulaSet) -> Self {
        self.formulas = formulas;
        self
    }

    pub fn with_target_rows(mut self, rows: Vec<u32>) -> Self {
        self.target_rows = Some(rows);
        self
    }
}

/// What a finished job produced. The workbook is saved and closed.
#[derive(Debug)]
pub struct CopyCullOutcome {
    pub workbook: Workbook,
    /// Name the sheet is staged under (after any rename).
    pub sheet: String,
    pub rows_removed: usize,
    pub cells_written: usize,
}

/// Copy the source, stage the sheet, cull rows, write formulas, then save and
/// close the copy.
///
/// On error the copy is left on disk as it was before the failing step was
/// saved, which is the untouched copy of the source.
pub fn copycull(job: CopyCullJob) -> Result<CopyCullOutcome> {
    let mut workbook = Workbook::copy_from(
        &job.source,
        &job.output_filename,
        job.copy_to_dir.as_deref(),
    )?;

    let (sheet, rows_removed, cells_written) = {
        let mut editor = workbook.stage_ws(&job.sheet, &job.options)?;
        let rows_removed = if job.predicates.is_empty() {
            0
        } else {
            editor.cull(&job.predicates, job.combinator, job.mode)?
        };
        let cells_written = editor.add_formulas(&job.formulas, job.target_rows.as_deref())?;
        (editor.sheet_name().to_string(), rows_removed, cells_written)
    };

    workbook.close(true)?;
    info!(
        "{:?}: sheet {:?}, {} rows removed, {} cells written",
        workbook.target_path(),
        sheet,
        rows_removed,
        cells_written
    );
    Ok(CopyCullOutcome {
        workbook,
        sheet,
        rows_removed,
        cells_written,
    })
}
