//! Well label resolution
//!
//! Converts labels such as `"A1"` or `"AB12"` into [`PlateCoordinate`]s.
//!
//! Rows use alphabetic numbering (`A`..`Z`, then `AA`, `AB`, ...) and are
//! returned zero-based. Columns are returned exactly as written, so `"A1"`
//! resolves to row 0, column 1. Downstream plate layouts depend on that
//! asymmetry.

use crate::error::CoordinateError;
use labflow_model::PlateCoordinate;
use once_cell::sync::Lazy;
use regex::Regex;

static CELL_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("cell label pattern compiles"));

/// Resolve an optional well label
///
/// Absent or blank input resolves to an empty coordinate. Anything else must
/// be a well label; a malformed label is an error, never a default position.
///
/// # Examples
/// - `Some("A1")` → row 0, col 1
/// - `Some("AA12")` → row 26, col 12
/// - `None` → `{}`
pub fn cell_to_coordinate(cell: Option<&str>) -> Result<PlateCoordinate, CoordinateError> {
    let Some(label) = cell.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(PlateCoordinate::default());
    };

    let captures = CELL_LABEL
        .captures(label)
        .ok_or_else(|| CoordinateError::Malformed(label.to_string()))?;

    let row = row_from_letters(&captures[1])
        .ok_or_else(|| CoordinateError::OutOfRange(label.to_string()))?;
    let col = captures[2]
        .parse::<u32>()
        .map_err(|_| CoordinateError::OutOfRange(label.to_string()))?;

    Ok(PlateCoordinate::at(row, col))
}

/// Zero-based row number of an alphabetic row label
///
/// Case-insensitive. `None` on overflow or non-letters.
#[must_use]
pub fn row_from_letters(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut value: u32 = 0;
    for ch in letters.chars() {
        let ch = ch.to_ascii_lowercase();
        if !ch.is_ascii_lowercase() {
            return None;
        }
        let digit = u32::from(ch) - u32::from('a') + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value - 1)
}

/// Alphabetic label for a zero-based row
#[must_use]
pub fn row_label(row: u32) -> String {
    let mut n = u64::from(row) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Well label for a resolved position, the inverse of [`cell_to_coordinate`]
#[must_use]
pub fn coordinate_to_cell(row: u32, col: u32) -> String {
    format!("{}{col}", row_label(row))
}
