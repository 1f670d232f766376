//! Typed wrappers over the JSON cache port. Every cache interaction in the
//! engine is best-effort: a failing cache degrades to a miss.

use std::time::Duration;

use legalstat_core::CancellationToken;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::LegalStatusEngine;

impl LegalStatusEngine {
    /// Read and decode a cached document. Errors and undecodable entries are
    /// treated as misses.
    pub(crate) async fn cache_read<T: DeserializeOwned>(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Option<T> {
        if token.is_cancelled() {
            return None;
        }
        match self.ports().cache.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Encode and store a document.
    pub(crate) async fn cache_write<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        token: &CancellationToken,
    ) {
        let cache = &self.ports().cache;
        self.best_effort("cache_set", key, token, async {
            let json = serde_json::to_value(value)?;
            cache.set(key, json, ttl).await
        })
        .await;
    }

    /// Drop entries so the next reader goes to the repository.
    pub(crate) async fn cache_invalidate(&self, keys: Vec<String>, token: &CancellationToken) {
        let subject = keys.join(",");
        let cache = &self.ports().cache;
        self.best_effort("cache_delete", &subject, token, cache.delete(&keys))
            .await;
    }
}
