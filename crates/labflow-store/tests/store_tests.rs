use labflow_model::Run;
use labflow_store::prelude::*;
use labflow_test_utils::{sample_protocol, PROTOCOL_ID};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn cached() -> CachedStore<InMemoryStore> {
    CachedStore::new(
        InMemoryStore::new().with_actor("alice"),
        DocumentCache::new(CacheConfig::default().with_max_entries(10)),
    )
}

#[tokio::test]
async fn test_protocol_round_trip_through_cache() {
    let store = cached();
    let saved = store.upsert_protocol(sample_protocol()).await.unwrap();

    assert_eq!(saved.id.as_deref(), Some(PROTOCOL_ID));
    assert!(saved.audit.updated_on.is_some());
    assert_eq!(store.protocol(PROTOCOL_ID).await.unwrap(), saved);
    assert_eq!(store.inner().protocol_count(), 1);
}

#[tokio::test]
async fn test_cache_sees_latest_write() {
    let store = cached();
    let saved = store.upsert_run(Run::default()).await.unwrap();
    let id = saved.id.clone().unwrap();

    let mut edited = saved;
    edited.notes = "second pass".into();
    store.upsert_run(edited).await.unwrap();

    assert_eq!(store.run(&id).await.unwrap().notes, "second pass");
}

#[tokio::test]
async fn test_concurrent_saves_last_write_wins() {
    let store = Arc::new(cached());
    let base = store.upsert_run(Run::default()).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let mut run = base.clone();
            run.notes = format!("edit {i}");
            tokio::spawn(async move { store.upsert_run(run).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.inner().run(base.id.as_deref().unwrap()).await.unwrap();
    assert!(stored.notes.starts_with("edit "));
    assert_eq!(store.inner().run_count(), 1);
}

#[tokio::test]
async fn test_missing_run_is_not_found() {
    let err = cached().run("missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert!(!err.is_retryable());
}
