//! Writer for the .gwb workbook format

use std::io::Write;
use std::path::Path;

use copycull_engine::engine::CellValue;

use super::{WORKBOOK_HEADER, atomic_write, escape_text};
use crate::error::Result;
use crate::workbook::Sheet;

/// Write sheets to a .gwb file. The file is replaced atomically.
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let content = write_workbook_content(sheets);
    atomic_write(path, |file| {
        file.write_all(content.as_bytes())?;
        Ok(())
    })
}

/// Render sheets in .gwb format. Cells are sorted by row, then column.
pub fn write_workbook_content(sheets: &[Sheet]) -> String {
    let mut lines = vec![WORKBOOK_HEADER.to_string()];

    for sheet in sheets {
        lines.push(String::new());
        lines.push(format!("[sheet \"{}\"]", escape_text(&sheet.name)));

        for (addr, cell) in sheet.grid.sorted_cells() {
            let value_str = match &cell.value {
                CellValue::Empty => continue,
                CellValue::Number(n) => n.to_string(),
                CellValue::Text(s) => format!("\"{}\"", escape_text(s)),
                CellValue::Bool(true) => "TRUE".to_string(),
                CellValue::Bool(false) => "FALSE".to_string(),
                CellValue::Formula(f) => format!("={}", f),
            };
            match &cell.number_format {
                Some(format) => lines.push(format!(
                    "{} format \"{}\": {}",
                    addr,
                    escape_text(format),
                    value_str
                )),
                None => lines.push(format!("{}: {}", addr, value_str)),
            }
        }
    }

    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellGrid, SheetGrid};
    use crate::storage::parse_workbook_content;
    use copycull_engine::engine::Cell;

    fn sheet(name: &str) -> Sheet {
        Sheet::new(name, SheetGrid::new())
    }

    #[test]
    fn test_write_values() {
        let mut s = sheet("Data");
        s.grid.write_cell(1, 1, Cell::new_text("Hello"));
        s.grid.write_cell(1, 2, Cell::new_number(42.0));
        s.grid.write_cell(1, 3, Cell::new_bool(false));
        s.grid.write_cell(2, 1, Cell::new_formula("B1 * 2"));
        let content = write_workbook_content(&[s]);
        assert!(content.starts_with(WORKBOOK_HEADER));
        assert!(content.contains("[sheet \"Data\"]"));
        assert!(content.contains("A1: \"Hello\""));
        assert!(content.contains("B1: 42"));
        assert!(content.contains("C1: FALSE"));
        assert!(content.contains("A2: =B1 * 2"));
    }

    #[test]
    fn test_write_number_format() {
        let mut s = sheet("S");
        s.grid
            .write_cell(2, 7, Cell::new_formula("C2*E2").with_number_format("#,##0.00"));
        let content = write_workbook_content(&[s]);
        assert!(content.contains("G2 format \"#,##0.00\": =C2*E2"));
    }

    #[test]
    fn test_sorted_output() {
        let mut s = sheet("S");
        s.grid.write_cell(2, 2, Cell::new_number(3.0));
        s.grid.write_cell(1, 1, Cell::new_number(1.0));
        s.grid.write_cell(1, 2, Cell::new_number(2.0));
        let content = write_workbook_content(&[s]);
        let cells: Vec<_> = content
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('['))
            .collect();
        assert_eq!(cells, vec!["A1: 1", "B1: 2", "B2: 3"]);
    }

    #[test]
    fn test_written_content_parses_back() {
        let mut orders = sheet("Orders \"Q1\"");
        orders.grid.write_cell(1, 1, Cell::new_text("Region"));
        orders.grid.write_cell(2, 1, Cell::new_text("a\\b"));
        orders
            .grid
            .write_cell(2, 2, Cell::new_formula("A2&\":\"").with_number_format("hh:mm"));
        let empty = sheet("Notes");

        let sheets = parse_workbook_content(&write_workbook_content(&[orders, empty])).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Orders \"Q1\"");
        assert_eq!(sheets[0].grid.read_cell(2, 1), CellValue::Text("a\\b".into()));
        assert_eq!(
            sheets[0].grid.read_cell(2, 2),
            CellValue::Formula("A2&\":\"".into())
        );
        assert!(sheets[1].grid.is_empty());
    }

    #[test]
    fn test_formula_whitespace_survives_reload() {
        let mut s = sheet("S");
        s.grid.write_cell(2, 7, Cell::new_formula(" A2 & \" x \" "));
        let sheets = parse_workbook_content(&write_workbook_content(&[s])).unwrap();
        assert_eq!(
            sheets[0].grid.read_cell(2, 7),
            CellValue::Formula(" A2 & \" x \" ".into())
        );
    }
}
