//! Protocol structure checks
//!
//! Section and block ids join templates to run instances, so they must be
//! present and unique across the whole protocol.

use crate::error::EngineError;
use labflow_model::Protocol;
use std::collections::HashSet;

/// One structural problem in a protocol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("section {index} has no id")]
    EmptySectionId { index: usize },

    #[error("duplicate section id '{0}'")]
    DuplicateSectionId(String),

    #[error("block {index} of section '{section}' has no id")]
    EmptyBlockId { section: String, index: usize },

    #[error("duplicate block id '{0}'")]
    DuplicateBlockId(String),
}

/// Every structural problem in the protocol, in document order
#[must_use]
pub fn validate_protocol(protocol: &Protocol) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut section_ids = HashSet::new();
    let mut block_ids = HashSet::new();

    for (index, section) in protocol.sections.iter().enumerate() {
        if section.id.trim().is_empty() {
            issues.push(ValidationIssue::EmptySectionId { index });
        } else if !section_ids.insert(section.id.as_str()) {
            issues.push(ValidationIssue::DuplicateSectionId(section.id.clone()));
        }

        for (index, block) in section.blocks.iter().enumerate() {
            let id = block.id();
            if id.trim().is_empty() {
                issues.push(ValidationIssue::EmptyBlockId {
                    section: section.id.clone(),
                    index,
                });
            } else if !block_ids.insert(id) {
                issues.push(ValidationIssue::DuplicateBlockId(id.to_string()));
            }
        }
    }

    issues
}

/// Fail with every issue found, if any
pub fn ensure_valid(protocol: &Protocol) -> Result<(), EngineError> {
    let issues = validate_protocol(protocol);
    if issues.is_empty() {
        Ok(())
    } else {
        tracing::warn!(issues = issues.len(), "protocol failed validation");
        Err(EngineError::Invalid(issues))
    }
}
