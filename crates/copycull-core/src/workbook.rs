//! Workbook: a copied spreadsheet file, its sheets, and the sheets staged for editing.
//!
//! The source file is never modified. A workbook copies it to a target path
//! and loads the copy; all edits go to the copy and are written back with
//! [`Workbook::save`] or [`Workbook::close`].
//!
//! The workbook owns every sheet grid (an arena indexed by [`SheetId`]).
//! Staged sheets hold only their own state plus an index into that arena,
//! and are moved between [`BindingState::Open`] and [`BindingState::Closed`]
//! whenever the workbook is loaded or closed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::editor::SheetEditor;
use crate::error::{CopycullError, Result};
use crate::grid::SheetGrid;
use crate::sheet::{BindingState, SheetBinding, SheetId, StageOptions};
use crate::storage::{read_workbook, write_workbook};

/// A named sheet in a workbook.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub name: String,
    pub grid: SheetGrid,
}

impl Sheet {
    pub fn new(name: impl Into<String>, grid: SheetGrid) -> Self {
        Sheet {
            name: name.into(),
            grid,
        }
    }
}

#[derive(Debug)]
pub struct Workbook {
    source_path: PathBuf,
    target_path: PathBuf,
    /// Loaded sheets; `None` while the workbook is closed.
    sheets: Option<Vec<Sheet>>,
    /// Staged sheets keyed by (current) sheet name.
    staged: BTreeMap<String, SheetBinding>,
}

impl Workbook {
    /// Copy `source` to `output_filename` inside `copy_to_dir` (default: the
    /// source's directory) and load the copy.
    pub fn copy_from(
        source: impl AsRef<Path>,
        output_filename: impl AsRef<Path>,
        copy_to_dir: Option<&Path>,
    ) -> Result<Self> {
        let source_path = source.as_ref().to_path_buf();
        let dir = match copy_to_dir {
            Some(dir) => dir.to_path_buf(),
            None => source_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let target_path = dir.join(output_filename.as_ref());
        if same_file(&source_path, &target_path) {
            return Err(CopycullError::SamePath(target_path));
        }

        let mut workbook = Workbook {
            source_path,
            target_path,
            sheets: None,
            staged: BTreeMap::new(),
        };
        workbook.copy_original(None, false)?;
        workbook.load()?;
        Ok(workbook)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Path of the working copy.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn is_loaded(&self) -> bool {
        self.sheets.is_some()
    }

    /// Copy the source workbook to `target` (default: the current target path).
    /// With `retarget`, the copy becomes the file this workbook works on, which
    /// is only allowed while the workbook is closed.
    pub fn copy_original(&mut self, target: Option<&Path>, retarget: bool) -> Result<PathBuf> {
        if self.is_loaded() && retarget {
            return Err(CopycullError::WorkbookOpen);
        }
        let target = target.map(Path::to_path_buf).unwrap_or_else(|| self.target_path.clone());
        if same_file(&self.source_path, &target) {
            return Err(CopycullError::SamePath(target));
        }
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&self.source_path, &target)?;
        debug!("copied {:?} to {:?}", self.source_path, target);
        if retarget {
            self.target_path = target.clone();
        }
        Ok(target)
    }

    /// Open the working copy and reattach every staged sheet. No-op when already loaded.
    pub fn load(&mut self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        self.sheets = Some(read_workbook(&self.target_path)?);
        info!("loaded {:?}", self.target_path);
        self.inform_subordinates()
    }

    /// Close the workbook, optionally saving first. Staged sheets stay staged
    /// but are detached until the workbook is loaded again.
    pub fn close(&mut self, save: bool) -> Result<()> {
        if !self.is_loaded() {
            return Ok(());
        }
        if save {
            self.save()?;
        }
        self.sheets = None;
        info!("closed {:?}", self.target_path);
        self.inform_subordinates()
    }

    /// Write the loaded sheets to the working copy.
    pub fn save(&mut self) -> Result<()> {
        let sheets = self.sheets.as_ref().ok_or(CopycullError::DetachedResource)?;
        write_workbook(&self.target_path, sheets)?;
        info!("saved {:?}", self.target_path);
        Ok(())
    }

    /// Discard in-memory changes and re-read the working copy.
    pub fn reload(&mut self) -> Result<()> {
        self.close(false)?;
        self.load()
    }

    fn mandate_loaded(&self) -> Result<&Vec<Sheet>> {
        self.sheets.as_ref().ok_or(CopycullError::DetachedResource)
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.mandate_loaded()?
            .iter()
            .position(|sheet| sheet.name == name)
            .ok_or_else(|| CopycullError::UnknownSheet(name.to_string()))
    }

    /// Names of all sheets in file order.
    pub fn sheet_names(&self) -> Result<Vec<String>> {
        Ok(self
            .mandate_loaded()?
            .iter()
            .map(|sheet| sheet.name.clone())
            .collect())
    }

    /// Names of the staged sheets.
    pub fn staged_names(&self) -> impl Iterator<Item = &str> {
        self.staged.keys().map(String::as_str)
    }

    pub fn binding(&self, name: &str) -> Option<&SheetBinding> {
        self.staged.get(name)
    }

    /// Prepare a sheet for modification. Staging a sheet again replaces its
    /// previous binding. With `options.rename`, the sheet is renamed and is
    /// staged under its new name.
    pub fn stage_ws(&mut self, name: &str, options: &StageOptions) -> Result<SheetEditor<'_>> {
        let idx = self.position(name)?;
        let sheets = self.mandate_loaded()?;
        let binding = SheetBinding::stage(name, SheetId(idx), &sheets[idx].grid, options)?;
        if let Some(new_name) = options.rename.as_deref() {
            if new_name != name && self.position(new_name).is_ok() {
                return Err(CopycullError::DuplicateSheet(new_name.to_string()));
            }
        }
        self.staged.insert(name.to_string(), binding);

        let staged_name = match options.rename.as_deref() {
            Some(new_name) if new_name != name => {
                self.rename_ws(name, new_name)?;
                new_name.to_string()
            }
            _ => name.to_string(),
        };
        self.sheet(&staged_name)
    }

    /// Editor for a staged sheet. Works while closed too, but every
    /// cell-touching operation then fails with `DetachedResource`.
    pub fn sheet(&mut self, name: &str) -> Result<SheetEditor<'_>> {
        let binding = self
            .staged
            .get_mut(name)
            .ok_or_else(|| CopycullError::UnknownSheet(name.to_string()))?;
        let grid = match (binding.state, self.sheets.as_mut()) {
            (BindingState::Open(SheetId(idx)), Some(sheets)) => {
                sheets.get_mut(idx).map(|sheet| &mut sheet.grid)
            }
            _ => None,
        };
        Ok(SheetEditor::new(binding, grid))
    }

    /// Rename a staged sheet; its binding is re-keyed under the new name.
    pub fn rename_ws(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let idx = self.position(old_name)?;
        if !self.staged.contains_key(old_name) {
            return Err(CopycullError::UnknownSheet(old_name.to_string()));
        }
        if old_name == new_name {
            return Ok(());
        }
        if self.position(new_name).is_ok() {
            return Err(CopycullError::DuplicateSheet(new_name.to_string()));
        }

        if let Some(sheets) = self.sheets.as_mut() {
            sheets[idx].name = new_name.to_string();
        }
        if let Some(mut binding) = self.staged.remove(old_name) {
            binding.sheet_name = new_name.to_string();
            self.staged.insert(new_name.to_string(), binding);
        }
        debug!("renamed sheet {:?} to {:?}", old_name, new_name);
        Ok(())
    }

    /// Remove a sheet (staged or not) from the workbook.
    pub fn delete_ws(&mut self, name: &str) -> Result<()> {
        let idx = self.position(name)?;
        if let Some(sheets) = self.sheets.as_mut() {
            sheets.remove(idx);
        }
        self.staged.remove(name);
        debug!("deleted sheet {:?}", name);
        self.inform_subordinates()
    }

    /// Point every staged sheet at its grid in the arena, or detach it when
    /// the workbook is closed.
    fn inform_subordinates(&mut self) -> Result<()> {
        let mut missing = None;
        for (name, binding) in self.staged.iter_mut() {
            match self.sheets.as_ref() {
                Some(sheets) => match sheets.iter().position(|sheet| sheet.name == *name) {
                    Some(idx) => binding.attach(SheetId(idx)),
                    None => {
                        warn!("staged sheet {:?} is missing from the workbook", name);
                        binding.detach();
                        missing.get_or_insert_with(|| name.clone());
                    }
                },
                None => binding.detach(),
            }
        }
        match missing {
            Some(name) => Err(CopycullError::UnknownSheet(name)),
            None => Ok(()),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
