//! Persistence boundary
//!
//! Saves are whole-document, create-or-replace calls keyed by the presence of
//! an `id`. No field-level merge or version check is made; the last write
//! wins.

use crate::error::StoreError;
use async_trait::async_trait;
use labflow_model::{Protocol, Run};

/// Document store for protocols and runs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or replace a protocol, returning it with its assigned id
    async fn upsert_protocol(&self, protocol: Protocol) -> Result<Protocol, StoreError>;

    /// Create or replace a run, returning it with its assigned id
    async fn upsert_run(&self, run: Run) -> Result<Run, StoreError>;

    /// Protocol by id
    async fn protocol(&self, id: &str) -> Result<Protocol, StoreError>;

    /// Run by id
    async fn run(&self, id: &str) -> Result<Run, StoreError>;

    /// Every stored run
    async fn runs(&self) -> Result<Vec<Run>, StoreError>;
}
