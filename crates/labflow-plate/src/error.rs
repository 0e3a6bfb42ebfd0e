//! Error types for plate data resolution
//!
//! Two failure classes are kept apart so callers can react differently:
//! - malformed input (bad well label, missing required column) fails fast
//! - an upload with no usable rows is an empty result, a warning-level no-op

use crate::table::TableKind;

/// Well label could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    /// Label does not match `^[A-Za-z]+[0-9]+$`
    #[error("malformed cell label: '{0}'")]
    Malformed(String),

    /// Row letters or column digits exceed the addressable range
    #[error("cell label out of range: '{0}'")]
    OutOfRange(String),
}

/// Uploaded rows could not be normalized
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// Required column absent or blank
    #[error("row {row}: missing required column '{column}'")]
    MissingField { row: usize, column: &'static str },

    /// Well label in a row failed to resolve
    #[error("row {row}: {source}")]
    MalformedCell {
        row: usize,
        #[source]
        source: CoordinateError,
    },

    /// Column holds a value of the wrong shape
    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    /// No usable rows survived normalization
    #[error("no usable rows in {0} upload")]
    Empty(TableKind),
}

impl NormalizeError {
    /// Create missing-field error
    #[inline]
    pub fn missing(row: usize, column: &'static str) -> Self {
        Self::MissingField { row, column }
    }

    /// Create invalid-value error
    #[inline]
    pub fn invalid(row: usize, column: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            row,
            column,
            value: value.into(),
        }
    }

    /// Whether this is the warning-level empty result rather than malformed input
    #[inline]
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}
