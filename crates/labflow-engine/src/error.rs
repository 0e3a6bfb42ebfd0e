//! Error types for the run engine
//!
//! Covers:
//! - Join-by-id misses when updating sections and blocks
//! - Edits rejected because a section or protocol is signed off
//! - Sign-off transitions applied out of order
//! - Uploads that failed normalization or target the wrong block
//! - Protocol structure problems found by validation

use crate::validation::ValidationIssue;
use labflow_model::BlockKind;
use labflow_plate::NormalizeError;

/// Main engine error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// No section with this id
    #[error("section not found: {0}")]
    SectionNotFound(String),

    /// No block with this id in the section
    #[error("block '{block}' not found in section '{section}'")]
    BlockNotFound { section: String, block: String },

    /// Section is signed or witnessed; its blocks are read-only
    #[error("section '{0}' is signed off and cannot be edited")]
    SectionLocked(String),

    /// Protocol is signed or witnessed; its structure is read-only
    #[error("protocol is signed off and cannot be edited")]
    ProtocolLocked,

    /// Witnessing requires a signature first
    #[error("'{0}' must be signed before it can be witnessed")]
    NotSigned(String),

    /// Section opts out of both signature and witness
    #[error("section '{0}' does not take sign-offs")]
    NotSignable(String),

    /// Upload aimed at a block of the wrong kind
    #[error("block '{block}' is {found}, expected {expected}")]
    KindMismatch {
        block: String,
        expected: BlockKind,
        found: BlockKind,
    },

    /// Uploaded rows failed normalization
    #[error("upload rejected: {0}")]
    Upload(#[from] NormalizeError),

    /// Protocol failed structural validation
    #[error("invalid protocol: {}", format_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

impl EngineError {
    /// Create block-not-found error
    #[inline]
    pub fn block_not_found(section: impl Into<String>, block: impl Into<String>) -> Self {
        Self::BlockNotFound {
            section: section.into(),
            block: block.into(),
        }
    }

    /// Whether the edit was refused because the document is signed off
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::SectionLocked(_) | Self::ProtocolLocked)
    }

    /// Whether this is an upload that produced no usable rows
    ///
    /// Callers treat these as warnings: nothing was applied and existing data
    /// is intact.
    #[inline]
    #[must_use]
    pub fn is_empty_upload(&self) -> bool {
        matches!(self, Self::Upload(err) if err.is_empty_result())
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_plate::TableKind;

    #[test]
    fn locked_classification() {
        assert!(EngineError::SectionLocked("s1".into()).is_locked());
        assert!(EngineError::ProtocolLocked.is_locked());
        assert!(!EngineError::SectionNotFound("s1".into()).is_locked());
    }

    #[test]
    fn empty_upload_classification() {
        let err = EngineError::from(NormalizeError::Empty(TableKind::PlateMapping));
        assert!(err.is_empty_upload());
        assert_eq!(err.to_string(), "upload rejected: no usable rows in plate mapping upload");

        let err = EngineError::from(NormalizeError::missing(0, "plate"));
        assert!(!err.is_empty_upload());
    }

    #[test]
    fn invalid_lists_every_issue() {
        let err = EngineError::Invalid(vec![
            ValidationIssue::EmptySectionId { index: 0 },
            ValidationIssue::DuplicateBlockId("b1".into()),
        ]);
        let message = err.to_string();
        assert!(message.contains("section 0 has no id"));
        assert!(message.contains("duplicate block id 'b1'"));
    }
}
