//! Plate records
//!
//! Resolved well positions, sequencer results and marker tables, plus the
//! loosely typed [`CellValue`] carried in from uploaded spreadsheets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A single spreadsheet cell: either text or a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Numeric cell
    Number(f64),
    /// Text cell
    Text(String),
}

impl CellValue {
    /// Whether this cell holds text
    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Whether the cell is blank (empty or whitespace-only text)
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Numeric value, if this is a number cell
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Text rendering of the cell
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

/// Resolved well position with optional sample identity
///
/// `row` is zero-based; `col` is the column number exactly as written on the
/// plate (one-based).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateCoordinate {
    /// Zero-based row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    /// Column as written (one-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
    /// Numeric sample barcode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_label: Option<f64>,
}

impl PlateCoordinate {
    /// Coordinate at a resolved position
    #[inline]
    #[must_use]
    pub fn at(row: u32, col: u32) -> Self {
        Self {
            row: Some(row),
            col: Some(col),
            sample_label: None,
        }
    }

    /// Attach a sample label
    #[inline]
    #[must_use]
    pub fn with_sample(mut self, sample_label: f64) -> Self {
        self.sample_label = Some(sample_label);
        self
    }

    /// Whether neither row nor column is known
    #[inline]
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.row.is_none() && self.col.is_none()
    }
}

/// Sequencer output for one well
///
/// Known fields are typed; any other uploaded columns are carried through in
/// `extra` unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateResult {
    /// Plate barcode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_label: Option<String>,
    /// Position of the plate within a sequencing batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_index: Option<u32>,
    /// Zero-based row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_row: Option<u32>,
    /// Column as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_col: Option<u32>,
    /// First index marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker1: Option<String>,
    /// Second index marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker2: Option<String>,
    /// Result call for the well
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    /// Uploaded columns with no typed counterpart
    #[serde(flatten)]
    pub extra: IndexMap<String, CellValue>,
}

impl PlateResult {
    /// Whether this result sits at the given plate position
    #[must_use]
    pub fn is_at(&self, plate_label: &str, row: u32, col: u32) -> bool {
        self.plate_label.as_deref() == Some(plate_label)
            && self.plate_row == Some(row)
            && self.plate_col == Some(col)
    }
}

/// Marker pair to well mapping entry used by end-of-run sequencing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateMarkerEntry {
    /// First index marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker1: Option<String>,
    /// Second index marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker2: Option<String>,
    /// Order of the plate within the sequencing batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_index: Option<u32>,
    /// Zero-based row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_row: Option<u32>,
    /// Column as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_column: Option<u32>,
}

impl PlateMarkerEntry {
    /// Lookup key: both markers concatenated, absent markers contributing nothing
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}{}",
            self.marker1.as_deref().unwrap_or_default(),
            self.marker2.as_deref().unwrap_or_default()
        )
    }
}
