//! In-memory TTL cache.
//!
//! Expiry uses `tokio::time::Instant`, so tests running with a paused clock
//! can advance past a TTL without sleeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use legalstat_core::{PortError, StatusCache};
use serde_json::Value;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// `StatusCache` over a concurrent hash map.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
    fail: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry that never expires.
    pub fn insert(&self, key: &str, value: Value) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    /// Whether `key` holds a live entry.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries.get(key).is_some_and(|e| e.live(now))
    }

    /// Make every operation fail with `Unavailable`.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PortError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(PortError::Unavailable("cache offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatusCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, PortError> {
        self.check()?;
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .and_then(|e| e.live(now).then(|| e.value.clone()));
        if hit.is_none() {
            self.entries.remove_if(key, |_, e| !e.live(now));
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), PortError> {
        self.check()?;
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), PortError> {
        self.check()?;
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }
}
