//! Parser for the .gwb workbook format

use std::fs;
use std::path::Path;

use copycull_engine::engine::{Cell, CellAddr, CellValue};

use super::unescape_text;
use crate::error::{CopycullError, Result};
use crate::grid::{CellGrid, SheetGrid};
use crate::workbook::Sheet;

/// Read a .gwb file into its sheets, in file order.
pub fn read_workbook(path: &Path) -> Result<Vec<Sheet>> {
    let content = fs::read_to_string(path)?;
    parse_workbook_content(&content)
}

/// Parse .gwb content from a string.
pub fn parse_workbook_content(content: &str) -> Result<Vec<Sheet>> {
    let mut sheets: Vec<Sheet> = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        // Trailing whitespace may belong to formula text.
        let line = line.trim_start();
        let trimmed = line.trim_end();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with('[') {
            let name = parse_section(trimmed, line_num)?;
            if sheets.iter().any(|sheet| sheet.name == name) {
                return Err(parse_error(line_num, format!("duplicate sheet {:?}", name)));
            }
            sheets.push(Sheet::new(name, SheetGrid::new()));
            continue;
        }

        let Some(sheet) = sheets.last_mut() else {
            return Err(parse_error(line_num, "cell before any [sheet \"Name\"] section"));
        };

        let (addr, number_format, value) = parse_cell_line(line, line_num)?;
        let value = parse_cell_value(value, line_num)?;
        if value.is_empty() {
            continue;
        }
        let mut cell = Cell::new(value);
        cell.number_format = number_format;
        sheet.grid.write_cell(addr.row, addr.col, cell);
    }

    Ok(sheets)
}

fn parse_error(line: usize, message: impl Into<String>) -> CopycullError {
    CopycullError::Parse {
        line,
        message: message.into(),
    }
}

/// `[sheet "Name"]`
fn parse_section(line: &str, line_num: usize) -> Result<String> {
    let inner = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|rest| rest.trim().strip_prefix("sheet"))
        .map(str::trim)
        .ok_or_else(|| parse_error(line_num, "expected '[sheet \"Name\"]'"))?;
    match quoted(inner) {
        Some((name, "")) if !name.is_empty() => Ok(name),
        _ => Err(parse_error(line_num, "sheet name must be a non-empty quoted string")),
    }
}

/// `CELLREF [format "CODE"]: VALUE`
fn parse_cell_line(line: &str, line_num: usize) -> Result<(CellAddr, Option<String>, &str)> {
    let ref_end = line
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(line.len());
    let (ref_str, rest) = line.split_at(ref_end);
    let addr = CellAddr::parse(ref_str)
        .ok_or_else(|| parse_error(line_num, format!("invalid cell reference: {}", ref_str)))?;

    let mut rest = rest.trim_start();
    let mut number_format = None;
    if let Some(after) = rest.strip_prefix("format") {
        let (code, after) = quoted(after.trim_start())
            .ok_or_else(|| parse_error(line_num, "format code must be a quoted string"))?;
        number_format = Some(code);
        rest = after.trim_start();
    }

    let value = rest
        .strip_prefix(':')
        .ok_or_else(|| parse_error(line_num, "expected 'CELLREF: VALUE' format"))?;
    Ok((addr, number_format, value))
}

/// Split a leading quoted string off `input`, returning its unescaped text and the remainder.
fn quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut escaped = false;
    for (idx, ch) in body.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some((unescape_text(&body[..idx]), &body[idx + 1..])),
            _ => {}
        }
    }
    None
}

fn parse_cell_value(value: &str, line_num: usize) -> Result<CellValue> {
    let value = value.trim_start();

    // Formula text is kept verbatim after the `=`.
    if let Some(formula) = value.strip_prefix('=') {
        return Ok(CellValue::Formula(formula.to_string()));
    }

    let value = value.trim_end();
    if value.is_empty() {
        return Ok(CellValue::Empty);
    }

    if value.starts_with('"') {
        return match quoted(value) {
            Some((text, "")) => Ok(CellValue::Text(text)),
            _ => Err(parse_error(line_num, format!("unterminated text: {}", value))),
        };
    }

    if value.eq_ignore_ascii_case("true") {
        return Ok(CellValue::Bool(true));
    }
    if value.eq_ignore_ascii_case("false") {
        return Ok(CellValue::Bool(false));
    }

    if let Ok(n) = value.parse::<f64>() {
        return Ok(CellValue::Number(n));
    }

    Err(parse_error(
        line_num,
        format!("invalid value: {}. Use quotes for text.", value),
    ))
}
