//! In-process document store
//!
//! Backs the CLI and tests. Documents without an id get a fresh ULID on
//! first save; every save stamps the audit fields.

use crate::error::{Operation, StoreError};
use crate::store::DocumentStore;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use labflow_model::{Protocol, Run};
use ulid::Ulid;

/// Concurrent in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    protocols: DashMap<String, Protocol>,
    runs: DashMap<String, Run>,
    actor: Option<String>,
}

impl InMemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp writes as made by `actor`
    #[inline]
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Number of stored protocols
    #[inline]
    #[must_use]
    pub fn protocol_count(&self) -> usize {
        self.protocols.len()
    }

    /// Number of stored runs
    #[inline]
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}

fn assign_id(id: &mut Option<String>) -> String {
    id.get_or_insert_with(|| Ulid::new().to_string()).clone()
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn upsert_protocol(&self, mut protocol: Protocol) -> Result<Protocol, StoreError> {
        let id = assign_id(&mut protocol.id);
        protocol.audit.touch(self.actor.as_deref(), Utc::now());
        tracing::debug!(protocol = %id, "stored protocol");
        self.protocols.insert(id, protocol.clone());
        Ok(protocol)
    }

    async fn upsert_run(&self, mut run: Run) -> Result<Run, StoreError> {
        let id = assign_id(&mut run.id);
        run.audit.touch(self.actor.as_deref(), Utc::now());
        tracing::debug!(run = %id, status = %run.status, "stored run");
        self.runs.insert(id, run.clone());
        Ok(run)
    }

    async fn protocol(&self, id: &str) -> Result<Protocol, StoreError> {
        self.protocols
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(Operation::FetchProtocol, id))
    }

    async fn run(&self, id: &str) -> Result<Run, StoreError> {
        self.runs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(Operation::FetchRun, id))
    }

    async fn runs(&self) -> Result<Vec<Run>, StoreError> {
        Ok(self.runs.iter().map(|entry| entry.value().clone()).collect())
    }
}
