//! Labflow Store
//!
//! The persistence boundary for protocols and runs:
//! - [`DocumentStore`]: whole-document upsert and fetch
//! - [`InMemoryStore`]: concurrent in-process implementation
//! - [`DocumentCache`] / [`CachedStore`]: id-keyed read cache with a bounded
//!   entry count and maximum age, injected at construction
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_store::prelude::*;
//!
//! let cache = DocumentCache::new(CacheConfig::default());
//! let store = CachedStore::new(InMemoryStore::new(), cache);
//! let saved = store.upsert_run(run).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod cache;
pub mod error;
pub mod memory;
pub mod store;

// Re-exports
pub use cache::{CacheConfig, CacheStats, CachedStore, DocumentCache};
pub use error::{Operation, StoreError};
pub use memory::InMemoryStore;
pub use store::DocumentStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the store
    pub use crate::{
        CacheConfig, CachedStore, DocumentCache, DocumentStore, InMemoryStore, StoreError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
