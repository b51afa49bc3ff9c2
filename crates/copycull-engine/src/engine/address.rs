//! Column letters and cell addresses.
//!
//! Provides bidirectional conversion between spreadsheet-style notation
//! (e.g., "A", "AA", "B3") and 1-based column/row positions. Positions are
//! 1-based throughout, matching the row numbers users see in a spreadsheet.
//!
//! # Examples
//!
//! ```
//! use copycull_engine::engine::{CellAddr, column_index, column_letters};
//!
//! assert_eq!(column_index("AA"), Some(27));
//! assert_eq!(column_letters(28), "AB");
//! let addr: CellAddr = "B3".parse().unwrap();
//! assert_eq!((addr.col, addr.row), (2, 3));
//! assert_eq!(addr.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$").expect("A1 regex must compile")
    })
}

/// Convert column letters to a 1-based column position ("A" -> 1, "AA" -> 27).
/// Returns None for empty input, non-letters, or overflow.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut acc = 0u32;
    for c in letters.bytes() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() - b'A') as u32 + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    Some(acc)
}

/// Convert a 1-based column position to letters (1 -> A, 26 -> Z, 27 -> AA).
pub fn column_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col as u64;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// A reference to a cell by 1-based column and row.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellAddr {
    pub row: u32,
    pub col: u32,
}

impl CellAddr {
    pub fn new(col: u32, row: u32) -> CellAddr {
        CellAddr { row, col }
    }

    /// Parse a cell address from A1 notation. Returns None if the input is invalid.
    pub fn parse(name: &str) -> Option<CellAddr> {
        let caps = a1_re().captures(name)?;
        let col = column_index(&caps["letters"])?;
        let row = caps["numbers"].parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellAddr::new(col, row))
    }
}

impl std::str::FromStr for CellAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellAddr::parse(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}
