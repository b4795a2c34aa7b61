// src/store/mod.rs
//! Seen-state: two independent sets (ids, fingerprint digests), each with a
//! rolling expiry that every write pushes forward.

pub mod memory;
pub mod upstash;

use std::collections::HashSet;
use std::time::Duration;

use crate::error::Result;

/// Dead-man's switch: only matters if the scheduler stops invoking runs.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

#[async_trait::async_trait]
pub trait SeenStore: Send + Sync {
    async fn members(&self, key: &str) -> Result<HashSet<String>>;
    /// No-op on empty input.
    async fn add_members(&self, key: &str, values: &[String]) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    pub identity: String,
    pub fingerprints: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            identity: "watch:seen_ids".to_string(),
            fingerprints: "watch:seen_fps".to_string(),
        }
    }
}

/// Snapshot read at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct SeenState {
    /// The identity set has never been written.
    pub first_run: bool,
    pub ids: HashSet<String>,
    pub fingerprints: HashSet<String>,
}

/// Read both sets. First run is decided by key existence, not by an empty read.
pub async fn load_seen_state(store: &dyn SeenStore, keys: &StoreKeys) -> Result<SeenState> {
    if !store.exists(&keys.identity).await? {
        return Ok(SeenState {
            first_run: true,
            ..SeenState::default()
        });
    }
    Ok(SeenState {
        first_run: false,
        ids: store.members(&keys.identity).await?,
        fingerprints: store.members(&keys.fingerprints).await?,
    })
}

/// Add `values` to `key` and push its expiry forward.
pub async fn add_and_refresh(
    store: &dyn SeenStore,
    key: &str,
    values: &[String],
    ttl: Duration,
) -> Result<()> {
    store.add_members(key, values).await?;
    store.refresh_expiry(key, ttl).await
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[tokio::test]
    async fn missing_identity_key_means_first_run() {
        let store = MemoryStore::new();
        let keys = StoreKeys::default();
        // fingerprints alone do not make it a subsequent run
        store
            .add_members(&keys.fingerprints, &["fp".to_string()])
            .await
            .unwrap();
        let state = load_seen_state(&store, &keys).await.unwrap();
        assert!(state.first_run);
        assert!(state.ids.is_empty());
    }

    #[tokio::test]
    async fn existing_sets_are_loaded() {
        let store = MemoryStore::new();
        let keys = StoreKeys::default();
        add_and_refresh(&store, &keys.identity, &["a:1".into()], DEFAULT_TTL)
            .await
            .unwrap();
        add_and_refresh(&store, &keys.fingerprints, &["f1".into(), "f2".into()], DEFAULT_TTL)
            .await
            .unwrap();
        let state = load_seen_state(&store, &keys).await.unwrap();
        assert!(!state.first_run);
        assert!(state.ids.contains("a:1"));
        assert_eq!(state.fingerprints.len(), 2);
        assert_eq!(store.ttl_of(&keys.identity), Some(DEFAULT_TTL));
    }
}
