//! CSV import and export for a single sheet

use std::path::Path;

use ::csv::{ReaderBuilder, WriterBuilder};
use copycull_engine::engine::{Cell, CellValue};
use log::debug;

use super::atomic_write;
use crate::error::{CopycullError, Result};
use crate::grid::{CellGrid, SheetGrid};
use crate::workbook::Sheet;

/// Read a CSV file into a new sheet named `sheet_name`. The first record
/// lands in row 1; ragged records are accepted.
pub fn import_csv(path: &Path, sheet_name: &str) -> Result<Sheet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut grid = SheetGrid::new();
    let mut records = 0u32;
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = row_idx as u32 + 1;
        for (col_idx, field) in record.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            grid.write_cell(row, col_idx as u32 + 1, parse_csv_field(field));
        }
        records += 1;
    }

    if records == 0 {
        return Err(CopycullError::EmptyCsv);
    }
    debug!("imported {} records from {:?}", records, path);
    Ok(Sheet::new(sheet_name, grid))
}

/// Parse a CSV field into a cell
/// - Valid number -> Number (unless it has leading zeros like "007")
/// - TRUE / FALSE (any case) -> Bool
/// - Otherwise -> Text, surrounding whitespace kept
pub(crate) fn parse_csv_field(field: &str) -> Cell {
    let trimmed = field.trim();
    if field != trimmed || trimmed.is_empty() {
        return Cell::new_text(field);
    }

    if trimmed.starts_with('0')
        && trimmed.len() > 1
        && !trimmed.starts_with("0.")
        && trimmed.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
    {
        return Cell::new_text(trimmed);
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return Cell::new_bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Cell::new_bool(false);
    }

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::new_number(n),
        _ => Cell::new_text(trimmed),
    }
}

/// Write a grid to CSV, anchored at A1. Formulas are written as their
/// `=` text; text that a spreadsheet would read as a formula is prefixed
/// with `'`.
pub fn export_csv(path: &Path, grid: &SheetGrid) -> Result<()> {
    let max_row = grid.last_populated_row();
    let max_col = grid.last_populated_col();

    atomic_write(path, |file| {
        let mut writer = WriterBuilder::new().from_writer(file);
        for row in 1..=max_row {
            let record: Vec<String> = (1..=max_col)
                .map(|col| export_field(&grid.read_cell(row, col)))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    })?;
    debug!("exported {} rows to {:?}", max_row, path);
    Ok(())
}

fn export_field(value: &CellValue) -> String {
    match value {
        CellValue::Text(text) => {
            let first_non_space = text.trim_start_matches([' ', '\t']).chars().next();
            if matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
                format!("'{}", text)
            } else {
                text.clone()
            }
        }
        other => other.to_input_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_csv_field_number() {
        assert_eq!(parse_csv_field("42").value, CellValue::Number(42.0));
        assert_eq!(parse_csv_field("-3.5").value, CellValue::Number(-3.5));
    }

    #[test]
    fn test_parse_csv_field_leading_zero() {
        assert_eq!(parse_csv_field("007").value, CellValue::Text("007".into()));
        assert_eq!(parse_csv_field("0").value, CellValue::Number(0.0));
        assert_eq!(parse_csv_field("0.5").value, CellValue::Number(0.5));
    }

    #[test]
    fn test_parse_csv_field_bool_and_text() {
        assert_eq!(parse_csv_field("TRUE").value, CellValue::Bool(true));
        assert_eq!(parse_csv_field("false").value, CellValue::Bool(false));
        assert_eq!(parse_csv_field("NaN").value, CellValue::Text("NaN".into()));
        assert_eq!(
            parse_csv_field("  padded  ").value,
            CellValue::Text("  padded  ".into())
        );
    }

    #[test]
    fn test_import_csv_quoted_and_ragged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "Region,Units\n\"North, East\",12\nSouth\n").unwrap();

        let sheet = import_csv(&path, "Orders").unwrap();
        assert_eq!(sheet.name, "Orders");
        assert_eq!(sheet.grid.read_cell(2, 1), CellValue::Text("North, East".into()));
        assert_eq!(sheet.grid.read_cell(2, 2), CellValue::Number(12.0));
        assert_eq!(sheet.grid.read_cell(3, 2), CellValue::Empty);
        assert_eq!(sheet.grid.last_populated_row(), 3);
    }

    #[test]
    fn test_import_empty_csv_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            import_csv(&path, "S"),
            Err(CopycullError::EmptyCsv)
        ));
    }

    #[test]
    fn test_export_csv_guards_formula_injection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut grid = SheetGrid::new();
        grid.write_cell(1, 1, Cell::new_text("=cmd()"));
        grid.write_cell(1, 2, Cell::new_formula("A2*2"));
        grid.write_cell(2, 1, Cell::new_number(3.0));
        grid.write_cell(2, 3, Cell::new_bool(true));

        export_csv(&path, &grid).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "'=cmd(),=A2*2,\n3,,TRUE\n");
    }
}
