// src/store/memory.rs
//! In-process [`SeenStore`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::SeenStore;
use crate::error::{Result, WatchError};

#[derive(Debug, Default)]
struct Inner {
    sets: HashMap<String, HashSet<String>>,
    ttls: HashMap<String, Duration>,
    writes: usize,
    fail: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a set directly (does not count as a write).
    pub fn with_set(self, key: &str, values: &[&str]) -> Self {
        {
            let mut inner = self.inner.lock().expect("memory store mutex poisoned");
            inner
                .sets
                .entry(key.to_string())
                .or_default()
                .extend(values.iter().map(|v| v.to_string()));
        }
        self
    }

    /// Make every subsequent call fail with `StoreUnavailable`.
    pub fn set_failing(&self, fail: bool) {
        self.inner.lock().expect("memory store mutex poisoned").fail = fail;
    }

    pub fn snapshot(&self, key: &str) -> HashSet<String> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.sets.get(key).cloned().unwrap_or_default()
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.ttls.get(key).copied()
    }

    /// Number of `add_members` calls that actually wrote something.
    pub fn write_count(&self) -> usize {
        self.inner.lock().expect("memory store mutex poisoned").writes
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| WatchError::store("memory store mutex poisoned"))?;
        if inner.fail {
            return Err(WatchError::store("memory store set to fail"));
        }
        Ok(inner)
    }
}

#[async_trait::async_trait]
impl SeenStore for MemoryStore {
    async fn members(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self.guard()?.sets.get(key).cloned().unwrap_or_default())
    }

    async fn add_members(&self, key: &str, values: &[String]) -> Result<()> {
        let mut inner = self.guard()?;
        if values.is_empty() {
            return Ok(());
        }
        inner
            .sets
            .entry(key.to_string())
            .or_default()
            .extend(values.iter().cloned());
        inner.writes += 1;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.guard()?.sets.contains_key(key))
    }

    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut inner = self.guard()?;
        if inner.sets.contains_key(key) {
            inner.ttls.insert(key.to_string(), ttl);
        }
        Ok(())
    }
}
