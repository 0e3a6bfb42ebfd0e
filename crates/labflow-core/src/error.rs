//! Error types for Labflow Core
//!
//! Wraps the engine and store errors so session callers handle one type,
//! plus the configuration and formula failures that originate here.

use labflow_engine::EngineError;
use labflow_store::StoreError;
use std::path::PathBuf;

/// Main core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Rule violation in the engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Formula could not be evaluated
    #[error("formula error: {0}")]
    Formula(#[from] FormulaError),

    /// Configuration file could not be read
    #[error("cannot read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::LabflowConfig`]
    #[error("invalid config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl CoreError {
    /// Check if a later attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_retryable())
    }

    /// Check if the target document or section is closed for edits
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Engine(err) if err.is_locked())
    }
}

/// Formula evaluation failure, shown to the user verbatim
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    /// Block carries no formula
    #[error("no formula")]
    NoFormula,

    /// Formula names a variable with no value
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Evaluator rejected the formula
    #[error("{0}")]
    Evaluation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_store::Operation;

    #[test]
    fn store_errors_keep_retry_classification() {
        let err: CoreError =
            StoreError::request(Operation::UpsertRun, Some("r1"), "connection reset").into();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "upsert run failed for 'r1': connection reset");

        let err: CoreError = StoreError::not_found(Operation::FetchRun, "r1").into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn locked_engine_errors_are_classified() {
        let err: CoreError = EngineError::ProtocolLocked.into();
        assert!(err.is_locked());
        let err: CoreError = EngineError::SectionNotFound("s1".into()).into();
        assert!(!err.is_locked());
    }

    #[test]
    fn formula_errors_render_verbatim() {
        assert_eq!(
            FormulaError::Evaluation("division by zero".into()).to_string(),
            "division by zero"
        );
        assert_eq!(
            CoreError::from(FormulaError::UnknownVariable("x".into())).to_string(),
            "formula error: unknown variable 'x'"
        );
    }
}
