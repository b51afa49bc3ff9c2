//! copycull-core - staged sheet editing on copied workbooks
//!
//! A [`Workbook`] copies a source file, loads the copy and stages sheets for
//! editing. A [`SheetEditor`] culls rows by predicate and writes generated
//! formulas, keeping protected rows in step with every deletion.

pub mod editor;
pub mod error;
pub mod grid;
pub mod job;
pub mod sheet;
pub mod storage;
pub mod workbook;

pub use editor::{CullMode, SheetEditor};
pub use error::{CopycullError, Result};
pub use grid::{CellGrid, SheetGrid};
pub use job::{CopyCullJob, CopyCullOutcome, copycull};
pub use sheet::{BindingState, SheetBinding, SheetId, StageOptions, shift_protected_rows_after_delete};
pub use workbook::{Sheet, Workbook};
