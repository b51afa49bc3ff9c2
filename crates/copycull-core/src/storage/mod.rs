//! File formats for workbooks.
//!
//! - `.gwb` - plain-text workbook, one `[sheet "Name"]` section per sheet
//! - `.csv` - single-sheet import and export

mod csv;
mod parser;
mod writer;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

pub use self::csv::{export_csv, import_csv};
pub use parser::{parse_workbook_content, read_workbook};
pub use writer::{write_workbook, write_workbook_content};

/// First line of every workbook written by [`write_workbook`].
pub const WORKBOOK_HEADER: &str = "# copycull workbook";

/// Write `dest` through a temp file in the same directory, then rename it into place.
pub(crate) fn atomic_write(
    dest: &Path,
    write_fn: impl FnOnce(&mut File) -> Result<()>,
) -> Result<()> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_fn(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

pub(crate) fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

/// Inverse of [`escape_text`]. Unknown escapes are kept as written.
pub(crate) fn unescape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
