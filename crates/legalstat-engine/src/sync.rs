//! # Single-Patent Sync
//!
//! Brings one local record in line with the authoritative office record.
//!
//! Steps run strictly in order:
//!
//! 1. read the local record (critical)
//! 2. fetch the remote record (critical; a failure bumps the local
//!    consecutive-failure counter)
//! 3. remember the remote observation (best-effort)
//! 4. compare raw status strings
//! 5. on change: persist (critical), append history, publish the change
//!    event, invalidate `legal_status:current:<id>` (all best-effort)
//! 6. stamp the successful sync (best-effort)
//!
//! A patent with no local record is created from the remote record on its
//! first sync and reported as changed with no previous status.

use std::time::Instant;

use legalstat_core::{
    cache_keys, CancellationToken, LocalStatusRecord, PatentId, PortError, RemoteStatusRecord,
    StatusChangeEvent, StatusHistoryEvent, Timestamp, UnifiedStatusCode,
};
use serde::{Deserialize, Serialize};

use crate::engine::{guarded, LegalStatusEngine};
use crate::error::EngineError;
use crate::telemetry;

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub patent_id: PatentId,
    /// Raw status stored before this run, `None` on first sync.
    pub previous_status: Option<String>,
    /// Raw status reported by the authority.
    pub current_status: String,
    pub previous_code: Option<UnifiedStatusCode>,
    pub current_code: UnifiedStatusCode,
    pub changed: bool,
    pub synced_at: Timestamp,
    pub source: String,
}

impl LegalStatusEngine {
    /// Synchronize one patent against the authoritative source.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] for an empty ID.
    /// - [`EngineError::Internal`] when the local read, remote fetch or
    ///   persistence fails.
    /// - [`EngineError::Cancelled`] when `token` fires first.
    pub async fn sync_status(
        &self,
        patent_id: &str,
        token: &CancellationToken,
    ) -> Result<SyncResult, EngineError> {
        let patent_id = PatentId::new(patent_id)?;
        self.sync_patent(&patent_id, token).await
    }

    #[tracing::instrument(skip_all, fields(patent_id = %patent_id))]
    pub(crate) async fn sync_patent(
        &self,
        patent_id: &PatentId,
        token: &CancellationToken,
    ) -> Result<SyncResult, EngineError> {
        let started = Instant::now();
        let outcome = self.run_sync(patent_id, token).await;
        let elapsed = started.elapsed().as_secs_f64();

        let changed = outcome.as_ref().map(|r| r.changed).unwrap_or(false);
        let labels = [("changed", telemetry::flag(changed))];
        self.metrics().inc_counter(telemetry::SYNC_TOTAL, &labels);
        self.metrics()
            .observe_histogram(telemetry::SYNC_DURATION_SECONDS, elapsed, &labels);

        match &outcome {
            Ok(result) => tracing::debug!(
                changed = result.changed,
                status = %result.current_status,
                "sync completed"
            ),
            Err(e) => {
                let stage = match e {
                    EngineError::Internal { operation, .. } => *operation,
                    EngineError::Cancelled => "cancelled",
                    EngineError::Validation(_) => "validation",
                    EngineError::NotFound(_) => "not_found",
                };
                self.metrics().inc_counter(
                    telemetry::SYNC_FAILURES_TOTAL,
                    &[("stage", stage.to_string())],
                );
                if matches!(e, EngineError::Cancelled) {
                    tracing::debug!("sync cancelled");
                } else {
                    tracing::error!(error = %e, "sync failed");
                }
            }
        }
        outcome
    }

    async fn run_sync(
        &self,
        patent_id: &PatentId,
        token: &CancellationToken,
    ) -> Result<SyncResult, EngineError> {
        let repository = &self.ports().repository;

        let local = guarded(
            token,
            "get_local_status",
            repository.get_by_patent_id(patent_id),
        )
        .await?;

        let remote = match guarded(
            token,
            "fetch_remote_status",
            self.ports().remote.fetch_remote_status(patent_id),
        )
        .await
        {
            Ok(remote) => remote,
            Err(e) => {
                if local.is_some() && !matches!(e, EngineError::Cancelled) {
                    self.note_sync_failure(patent_id, token).await;
                }
                return Err(e);
            }
        };

        let previous_status = local.as_ref().map(|r| r.current_status.clone());
        let changed = previous_status.as_deref() != Some(remote.status.as_str());

        match &local {
            Some(_) => {
                self.best_effort(
                    "record_remote_observation",
                    patent_id.as_str(),
                    token,
                    repository.record_remote_observation(patent_id, &remote.status),
                )
                .await;
                if changed {
                    guarded(
                        token,
                        "update_status",
                        repository.update_status(patent_id, &remote.status, remote.effective_date),
                    )
                    .await?;
                }
            }
            None => {
                let record = LocalStatusRecord::from_remote(patent_id.clone(), &remote);
                guarded(token, "create_local_status", repository.create(&record)).await?;
            }
        }

        let synced_at = Timestamp::now();
        if changed {
            self.propagate_change(patent_id, previous_status.clone(), &remote, synced_at, token)
                .await;
        }

        self.best_effort(
            "record_sync_success",
            patent_id.as_str(),
            token,
            repository.record_sync_success(patent_id, synced_at),
        )
        .await;
        // Dropped after the stamp so a re-warmed view carries the new sync time.
        self.cache_invalidate(vec![cache_keys::current(patent_id)], token)
            .await;

        let mapper = self.mapper();
        let previous_code = match (&local, &previous_status) {
            (Some(record), Some(status)) => Some(mapper.map_code(&record.jurisdiction, status).code),
            _ => None,
        };
        Ok(SyncResult {
            patent_id: patent_id.clone(),
            previous_status,
            current_code: mapper.map_code(&remote.jurisdiction, &remote.status).code,
            current_status: remote.status,
            previous_code,
            changed,
            synced_at,
            source: remote.source,
        })
    }

    /// History and change event for a persisted change.
    async fn propagate_change(
        &self,
        patent_id: &PatentId,
        previous_status: Option<String>,
        remote: &RemoteStatusRecord,
        changed_at: Timestamp,
        token: &CancellationToken,
    ) {
        let ports = self.ports();

        let event = StatusHistoryEvent::transition(
            patent_id.clone(),
            previous_status.clone(),
            remote.status.clone(),
            remote.effective_date,
            remote.source.clone(),
        );
        self.best_effort(
            "append_history",
            patent_id.as_str(),
            token,
            ports.repository.append_history(&event),
        )
        .await;

        let change = StatusChangeEvent {
            patent_id: patent_id.clone(),
            previous_status,
            current_status: remote.status.clone(),
            changed_at,
            source: remote.source.clone(),
        };
        let topic = self.config().event_topic.as_str();
        self.best_effort("publish_change", patent_id.as_str(), token, async {
            let payload = serde_json::to_value(&change)?;
            ports.publisher.publish(topic, patent_id.as_str(), &payload).await
        })
        .await;
    }

    async fn note_sync_failure(&self, patent_id: &PatentId, token: &CancellationToken) {
        let repository = &self.ports().repository;
        self.best_effort("record_sync_failure", patent_id.as_str(), token, async {
            let failures = repository.record_sync_failure(patent_id).await?;
            if failures >= self.config().sync_failure_threshold {
                tracing::warn!(
                    patent_id = %patent_id,
                    failures,
                    "consecutive sync failures reached threshold"
                );
            }
            Ok::<(), PortError>(())
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, local_record, remote_record};

    #[tokio::test]
    async fn change_is_persisted_and_published_once() {
        let fx = fixture();
        fx.repository.insert(local_record("US1", "US", "FILED"));
        fx.remote.set("US1", remote_record("US", "GRANTED"));

        let result = fx.engine.sync_status("US1", &CancellationToken::new()).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.previous_status.as_deref(), Some("FILED"));
        assert_eq!(result.current_code, UnifiedStatusCode::Granted);
        assert_eq!(result.previous_code, Some(UnifiedStatusCode::Filed));
        assert_eq!(fx.repository.status_updates(), vec![("US1".to_string(), "GRANTED".to_string())]);
        assert_eq!(fx.publisher.events().len(), 1);
        let stored = fx.repository.get("US1").unwrap();
        assert_eq!(stored.current_status, "GRANTED");
        assert_eq!(stored.previous_status.as_deref(), Some("FILED"));
    }

    #[tokio::test]
    async fn unchanged_status_publishes_nothing() {
        let fx = fixture();
        fx.repository.insert(local_record("US1", "US", "GRANTED"));
        fx.remote.set("US1", remote_record("US", "GRANTED"));

        let result = fx.engine.sync_status("US1", &CancellationToken::new()).await.unwrap();

        assert!(!result.changed);
        assert!(fx.repository.status_updates().is_empty());
        assert!(fx.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn empty_patent_id_is_rejected() {
        let fx = fixture();
        let err = fx.engine.sync_status("  ", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(fx.remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn remote_failure_is_fatal_and_counted() {
        let fx = fixture();
        fx.repository.insert(local_record("CN1", "CN", "授权"));
        fx.remote.fail_for("CN1", PortError::Unavailable("CNIPA down".into()));

        let err = fx.engine.sync_status("CN1", &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.kind(), "INTERNAL_ERROR");
        assert_eq!(fx.repository.get("CN1").unwrap().consecutive_sync_failures, 1);
        assert_eq!(
            fx.metrics.counter(telemetry::SYNC_FAILURES_TOTAL, &[("stage", "fetch_remote_status")]),
            1
        );
    }

    #[tokio::test]
    async fn persistence_failure_is_fatal() {
        let fx = fixture();
        fx.repository.insert(local_record("US1", "US", "FILED"));
        fx.remote.set("US1", remote_record("US", "GRANTED"));
        fx.repository.fail_updates(true);

        let err = fx.engine.sync_status("US1", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, EngineError::Internal { operation: "update_status", .. }));
        assert!(fx.publisher.events().is_empty());

        let stored = fx.repository.get("US1").unwrap();
        assert_eq!(stored.current_status, "FILED");
        assert_eq!(stored.remote_status.as_deref(), Some("GRANTED"));
        assert!(stored.last_sync_at.is_none());
        assert!(fx.repository.history("US1").is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_sync() {
        let fx = fixture();
        fx.repository.insert(local_record("US1", "US", "FILED"));
        fx.remote.set("US1", remote_record("US", "GRANTED"));
        fx.publisher.fail(true);

        let result = fx.engine.sync_status("US1", &CancellationToken::new()).await.unwrap();

        assert!(result.changed);
        assert_eq!(
            fx.metrics.counter(
                telemetry::SIDE_EFFECT_FAILURES_TOTAL,
                &[("effect", "publish_change")]
            ),
            1
        );
    }

    #[tokio::test]
    async fn first_sync_creates_record() {
        let fx = fixture();
        fx.remote.set("KR1", remote_record("KR", "등록"));

        let result = fx.engine.sync_status("KR1", &CancellationToken::new()).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.previous_status, None);
        assert_eq!(result.current_code, UnifiedStatusCode::Granted);
        let stored = fx.repository.get("KR1").unwrap();
        assert_eq!(stored.current_status, "등록");
        assert!(stored.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn second_sync_is_idempotent() {
        let fx = fixture();
        fx.repository.insert(local_record("EP1", "EP", "EXAMINATION IS IN PROGRESS"));
        fx.remote.set("EP1", remote_record("EP", "THE PATENT HAS BEEN GRANTED"));
        let token = CancellationToken::new();

        assert!(fx.engine.sync_status("EP1", &token).await.unwrap().changed);
        assert!(!fx.engine.sync_status("EP1", &token).await.unwrap().changed);
        assert_eq!(fx.publisher.events().len(), 1);
        assert_eq!(fx.metrics.counter(telemetry::SYNC_TOTAL, &[("changed", "false")]), 1);
    }

    #[tokio::test]
    async fn success_resets_failure_counter() {
        let fx = fixture();
        let mut record = local_record("JP1", "JP", "審査中");
        record.consecutive_sync_failures = 4;
        fx.repository.insert(record);
        fx.remote.set("JP1", remote_record("JP", "審査中"));

        fx.engine.sync_status("JP1", &CancellationToken::new()).await.unwrap();

        let stored = fx.repository.get("JP1").unwrap();
        assert_eq!(stored.consecutive_sync_failures, 0);
        assert_eq!(stored.remote_status.as_deref(), Some("審査中"));
    }

    #[tokio::test]
    async fn change_appends_history_and_drops_cache_entry() {
        let fx = fixture();
        fx.repository.insert(local_record("US1", "US", "FILED"));
        fx.remote.set("US1", remote_record("US", "PATENTED CASE"));
        let key = cache_keys::current(&PatentId::new("US1").unwrap());
        fx.cache.insert(&key, serde_json::json!({"stale": true}));

        fx.engine.sync_status("US1", &CancellationToken::new()).await.unwrap();

        assert!(!fx.cache.contains(&key));
        let history = fx.repository.history("US1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status.as_deref(), Some("FILED"));
        assert_eq!(history[0].to_status, "PATENTED CASE");
    }

    #[tokio::test]
    async fn unchanged_sync_refreshes_cached_sync_time() {
        let fx = fixture();
        let token = CancellationToken::new();
        fx.repository.insert(local_record("US1", "US", "GRANTED"));
        fx.remote.set("US1", remote_record("US", "GRANTED"));
        let before = fx.engine.get_current_status("US1", &token).await.unwrap();
        assert!(before.last_sync_at.is_none());

        let result = fx.engine.sync_status("US1", &token).await.unwrap();
        assert!(!result.changed);
        assert!(!fx.cache.contains("legal_status:current:US1"));

        let after = fx.engine.get_current_status("US1", &token).await.unwrap();
        assert_eq!(after.last_sync_at, Some(result.synced_at));
    }
}
