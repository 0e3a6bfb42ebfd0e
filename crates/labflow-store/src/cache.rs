//! Document cache using moka
//!
//! Caches fetched documents by id with a bounded entry count and a maximum
//! age. [`CachedStore`] wraps any [`DocumentStore`]: reads are served from the
//! cache when possible, writes go through to the store and refresh the cache
//! with the stored result.

use crate::error::StoreError;
use crate::store::DocumentStore;
use async_trait::async_trait;
use labflow_model::{Protocol, Run};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache eviction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached documents per kind
    pub max_entries: u64,
    /// Seconds after insertion before an entry expires
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_age_secs: 300,
        }
    }
}

impl CacheConfig {
    /// With entry limit
    #[inline]
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// With maximum entry age
    #[inline]
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_secs = max_age.as_secs();
        self
    }

    /// Maximum entry age
    #[inline]
    #[must_use]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Cached protocols
    pub protocols: u64,
    /// Cached runs
    pub runs: u64,
}

/// Protocol and run cache keyed by document id
#[derive(Debug, Clone)]
pub struct DocumentCache {
    protocols: Cache<String, Protocol>,
    runs: Cache<String, Run>,
}

impl DocumentCache {
    /// Create cache with the given eviction policy
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            protocols: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.max_age())
                .build(),
            runs: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.max_age())
                .build(),
        }
    }

    /// Cached protocol
    #[inline]
    pub async fn protocol(&self, id: &str) -> Option<Protocol> {
        self.protocols.get(id).await
    }

    /// Cached run
    #[inline]
    pub async fn run(&self, id: &str) -> Option<Run> {
        self.runs.get(id).await
    }

    /// Cache a protocol under its id; unsaved protocols are not cached
    pub async fn insert_protocol(&self, protocol: &Protocol) {
        if let Some(id) = protocol.id.clone() {
            self.protocols.insert(id, protocol.clone()).await;
        }
    }

    /// Cache a run under its id; unsaved runs are not cached
    pub async fn insert_run(&self, run: &Run) {
        if let Some(id) = run.id.clone() {
            self.runs.insert(id, run.clone()).await;
        }
    }

    /// Drop a cached protocol
    #[inline]
    pub async fn invalidate_protocol(&self, id: &str) {
        self.protocols.invalidate(id).await;
    }

    /// Drop a cached run
    #[inline]
    pub async fn invalidate_run(&self, id: &str) {
        self.runs.invalidate(id).await;
    }

    /// Drop every entry
    #[inline]
    pub fn invalidate_all(&self) {
        self.protocols.invalidate_all();
        self.runs.invalidate_all();
    }

    /// Get cache statistics
    ///
    /// Counts are approximate until pending maintenance has run.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            protocols: self.protocols.entry_count(),
            runs: self.runs.entry_count(),
        }
    }
}

/// Store wrapper serving reads from a [`DocumentCache`]
#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    cache: DocumentCache,
}

impl<S: DocumentStore> CachedStore<S> {
    /// Wrap a store with an injected cache
    #[inline]
    #[must_use]
    pub fn new(inner: S, cache: DocumentCache) -> Self {
        Self { inner, cache }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Injected cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for CachedStore<S> {
    async fn upsert_protocol(&self, protocol: Protocol) -> Result<Protocol, StoreError> {
        let id = protocol.id.clone();
        match self.inner.upsert_protocol(protocol).await {
            Ok(saved) => {
                self.cache.insert_protocol(&saved).await;
                Ok(saved)
            }
            Err(err) => {
                // The stored copy is now unknown
                if let Some(id) = id {
                    self.cache.invalidate_protocol(&id).await;
                }
                Err(err)
            }
        }
    }

    async fn upsert_run(&self, run: Run) -> Result<Run, StoreError> {
        let id = run.id.clone();
        match self.inner.upsert_run(run).await {
            Ok(saved) => {
                self.cache.insert_run(&saved).await;
                Ok(saved)
            }
            Err(err) => {
                // The stored copy is now unknown
                if let Some(id) = id {
                    self.cache.invalidate_run(&id).await;
                }
                Err(err)
            }
        }
    }

    async fn protocol(&self, id: &str) -> Result<Protocol, StoreError> {
        if let Some(protocol) = self.cache.protocol(id).await {
            tracing::trace!(protocol = id, "cache hit");
            return Ok(protocol);
        }
        let protocol = self.inner.protocol(id).await?;
        self.cache.insert_protocol(&protocol).await;
        Ok(protocol)
    }

    async fn run(&self, id: &str) -> Result<Run, StoreError> {
        if let Some(run) = self.cache.run(id).await {
            tracing::trace!(run = id, "cache hit");
            return Ok(run);
        }
        let run = self.inner.run(id).await?;
        self.cache.insert_run(&run).await;
        Ok(run)
    }

    async fn runs(&self) -> Result<Vec<Run>, StoreError> {
        self.inner.runs().await
    }
}
