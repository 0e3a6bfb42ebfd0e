//! Error types for document persistence

use std::fmt::{self, Display, Formatter};

/// Store call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UpsertProtocol,
    UpsertRun,
    FetchProtocol,
    FetchRun,
    ListRuns,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::UpsertProtocol => "upsert protocol",
            Operation::UpsertRun => "upsert run",
            Operation::FetchProtocol => "fetch protocol",
            Operation::FetchRun => "fetch run",
            Operation::ListRuns => "list runs",
        })
    }
}

/// Persistence failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The request reached the store and failed
    #[error("{operation} failed{}: {message}", for_id(.id))]
    Request {
        operation: Operation,
        id: Option<String>,
        message: String,
    },

    /// No document with this id
    #[error("{operation}: '{id}' not found")]
    NotFound { operation: Operation, id: String },
}

impl StoreError {
    /// Create request failure
    #[inline]
    pub fn request(operation: Operation, id: Option<&str>, message: impl Into<String>) -> Self {
        Self::Request {
            operation,
            id: id.map(str::to_string),
            message: message.into(),
        }
    }

    /// Create not-found error
    #[inline]
    pub fn not_found(operation: Operation, id: impl Into<String>) -> Self {
        Self::NotFound {
            operation,
            id: id.into(),
        }
    }

    /// Operation that failed
    #[inline]
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Request { operation, .. } | Self::NotFound { operation, .. } => *operation,
        }
    }

    /// Check if a later attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

fn for_id(id: &Option<String>) -> String {
    id.as_deref()
        .map(|id| format!(" for '{id}'"))
        .unwrap_or_default()
}
