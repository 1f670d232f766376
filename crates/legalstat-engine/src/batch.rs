//! # Batch Sync
//!
//! Fans a list of patent IDs out to [`LegalStatusEngine::sync_status`] on
//! separate tasks. A counting semaphore caps simultaneously in-flight
//! syncs, which is what protects the office APIs from overload.
//!
//! Once the request validates, the call itself never fails: per-item
//! failures, including cancellation while waiting for a slot, are collected
//! into [`BatchSyncResult::errors`] in input order.
//!
//! Workers live in a [`JoinSet`] owned by the call. Dropping the
//! `batch_sync` future, for example when a caller's deadline fires, aborts
//! every worker that has not finished.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use legalstat_core::{CancellationToken, JurisdictionCode, PatentId, ValidationError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::engine::LegalStatusEngine;
use crate::error::EngineError;
use crate::telemetry;

/// Batch sync request as received from callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSyncRequest {
    pub patent_ids: Vec<String>,
    /// Accepted for compatibility; resolution is the remote source's job.
    #[serde(default)]
    pub jurisdictions: Option<Vec<JurisdictionCode>>,
    /// Full rather than incremental resync at the remote source.
    #[serde(default)]
    pub force: bool,
}

impl BatchSyncRequest {
    pub fn new<I, S>(patent_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patent_ids: patent_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Validate and convert the IDs, in input order.
    ///
    /// Checks run in this order: empty batch, oversized batch, empty entry,
    /// duplicate entry.
    pub fn validate(&self, max_batch_size: usize) -> Result<Vec<PatentId>, ValidationError> {
        if self.patent_ids.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if self.patent_ids.len() > max_batch_size {
            return Err(ValidationError::BatchTooLarge {
                size: self.patent_ids.len(),
                max: max_batch_size,
            });
        }
        let mut seen = HashSet::with_capacity(self.patent_ids.len());
        let mut ids = Vec::with_capacity(self.patent_ids.len());
        for (index, raw) in self.patent_ids.iter().enumerate() {
            let id = PatentId::new(raw.as_str())
                .map_err(|_| ValidationError::EmptyBatchEntry { index })?;
            if !seen.insert(id.clone()) {
                return Err(ValidationError::DuplicatePatentId(id.to_string()));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

/// One failed batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub patent_id: String,
    pub error: String,
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSyncResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Succeeded items whose status changed.
    pub changed: usize,
    /// Failures in input order.
    pub errors: Vec<BatchItemError>,
    pub duration_ms: u64,
}

#[derive(Default)]
struct Collector {
    succeeded: AtomicUsize,
    changed: AtomicUsize,
    errors: Mutex<Vec<(usize, BatchItemError)>>,
    /// Items whose worker has not reported yet.
    pending: Mutex<BTreeMap<usize, PatentId>>,
}

impl Collector {
    fn succeed(&self, index: usize, changed: bool) {
        self.pending.lock().remove(&index);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        if changed {
            self.changed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn fail(&self, index: usize, patent_id: &PatentId, error: impl std::fmt::Display) {
        self.pending.lock().remove(&index);
        self.errors.lock().push((
            index,
            BatchItemError {
                patent_id: patent_id.to_string(),
                error: error.to_string(),
            },
        ));
    }
}

impl LegalStatusEngine {
    /// Sync every patent in `request` with bounded concurrency.
    ///
    /// # Errors
    ///
    /// Only [`EngineError::Validation`]. Per-item failures are reported in
    /// the result.
    #[tracing::instrument(skip_all, fields(size = request.patent_ids.len(), force = request.force))]
    pub async fn batch_sync(
        &self,
        request: &BatchSyncRequest,
        token: &CancellationToken,
    ) -> Result<BatchSyncResult, EngineError> {
        let ids = request.validate(self.config().max_batch_size)?;
        if let Some(jurisdictions) = &request.jurisdictions {
            tracing::debug!(?jurisdictions, "jurisdiction hint passed through to remote source");
        }

        let started = Instant::now();
        let total = ids.len();
        let width = self.config().max_batch_concurrency;
        tracing::info!(total, width, "batch sync started");

        let slots = Arc::new(Semaphore::new(width));
        let collector = Arc::new(Collector::default());
        // Dropping the set aborts every worker still running.
        let mut workers = JoinSet::new();

        for (index, patent_id) in ids.into_iter().enumerate() {
            collector.pending.lock().insert(index, patent_id.clone());
            let engine = self.clone();
            let slots = Arc::clone(&slots);
            let collector = Arc::clone(&collector);
            let token = token.clone();
            workers.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    permit = slots.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    collector.fail(index, &patent_id, EngineError::Cancelled);
                    return;
                };
                match engine.sync_patent(&patent_id, &token).await {
                    Ok(result) => collector.succeed(index, result.changed),
                    Err(e) => collector.fail(index, &patent_id, e),
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "batch worker aborted");
            }
        }
        let orphaned = std::mem::take(&mut *collector.pending.lock());
        for (index, patent_id) in orphaned {
            collector.fail(index, &patent_id, "worker aborted");
        }

        let mut errors = std::mem::take(&mut *collector.errors.lock());
        errors.sort_by_key(|(index, _)| *index);
        let errors: Vec<BatchItemError> = errors.into_iter().map(|(_, e)| e).collect();

        let elapsed = started.elapsed();
        let result = BatchSyncResult {
            total,
            succeeded: collector.succeeded.load(Ordering::Relaxed),
            failed: errors.len(),
            changed: collector.changed.load(Ordering::Relaxed),
            errors,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        };

        let outcome = match (result.succeeded, result.failed) {
            (_, 0) => "success",
            (0, _) => "failure",
            _ => "partial",
        };
        self.metrics()
            .inc_counter(telemetry::BATCH_TOTAL, &[("outcome", outcome.to_string())]);
        self.metrics()
            .observe_histogram(telemetry::BATCH_DURATION_SECONDS, elapsed.as_secs_f64(), &[]);
        tracing::info!(
            total,
            succeeded = result.succeeded,
            failed = result.failed,
            changed = result.changed,
            duration_ms = result.duration_ms,
            "batch sync finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, fixture_with, local_record, remote_record};
    use crate::EngineConfig;
    use legalstat_core::PortError;
    use std::time::Duration;

    #[test]
    fn validation_cases_are_distinct() {
        assert_eq!(
            BatchSyncRequest::new(Vec::<String>::new()).validate(500),
            Err(ValidationError::EmptyBatch)
        );
        let big: Vec<String> = (0..501).map(|i| format!("US{i}")).collect();
        assert_eq!(
            BatchSyncRequest::new(big).validate(500),
            Err(ValidationError::BatchTooLarge { size: 501, max: 500 })
        );
        assert_eq!(
            BatchSyncRequest::new(["US1", " "]).validate(500),
            Err(ValidationError::EmptyBatchEntry { index: 1 })
        );
        assert_eq!(
            BatchSyncRequest::new(["US1", "US2", "US1"]).validate(500),
            Err(ValidationError::DuplicatePatentId("US1".into()))
        );
        assert_eq!(BatchSyncRequest::new(["US1", "US2"]).validate(500).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_request_has_no_side_effects() {
        let fx = fixture();
        let err = fx
            .engine
            .batch_sync(&BatchSyncRequest::new(["US1", "US1"]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::DuplicatePatentId(_))));
        assert_eq!(fx.remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn partial_failure_is_itemized_in_input_order() {
        let fx = fixture();
        for id in ["US1", "US3", "US5"] {
            fx.repository.insert(local_record(id, "US", "FILED"));
            fx.remote.set(id, remote_record("US", "PUBLISHED"));
        }
        fx.remote.fail_for("US4", PortError::NotFound("US4".into()));
        fx.remote.fail_for("US2", PortError::Unavailable("timeout".into()));

        let result = fx
            .engine
            .batch_sync(
                &BatchSyncRequest::new(["US1", "US2", "US3", "US4", "US5"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.total, 5);
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.changed, 3);
        assert_eq!(result.failed, 2);
        let failed: Vec<&str> = result.errors.iter().map(|e| e.patent_id.as_str()).collect();
        assert_eq!(failed, vec!["US2", "US4"]);
        assert_eq!(fx.metrics.counter(telemetry::BATCH_TOTAL, &[("outcome", "partial")]), 1);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_width() {
        let config = EngineConfig {
            max_batch_concurrency: 3,
            ..EngineConfig::default()
        };
        let fx = fixture_with(config);
        let ids: Vec<String> = (0..12).map(|i| format!("EP{i}")).collect();
        for id in &ids {
            fx.remote.set(id, remote_record("EP", "PATENT EXPIRED"));
        }
        fx.remote.set_delay(Duration::from_millis(20));

        let result = fx
            .engine
            .batch_sync(&BatchSyncRequest::new(ids), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.succeeded, 12);
        assert!(fx.remote.max_in_flight() <= 3);
        assert!(fx.remote.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn cancelled_batch_records_every_item() {
        let fx = fixture();
        let token = CancellationToken::new();
        token.cancel();

        let result = fx
            .engine
            .batch_sync(&BatchSyncRequest::new(["KR1", "KR2"]), &token)
            .await
            .unwrap();

        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed, 2);
        assert!(result.errors.iter().all(|e| e.error.contains("cancelled")));
        assert_eq!(fx.remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn dropping_the_call_stops_pending_workers() {
        let config = EngineConfig {
            max_batch_concurrency: 2,
            ..EngineConfig::default()
        };
        let fx = fixture_with(config);
        let ids: Vec<String> = (0..10).map(|i| format!("JP{i}")).collect();
        for id in &ids {
            fx.remote.set(id, remote_record("JP", "登録"));
        }
        fx.remote.set_delay(Duration::from_millis(50));

        let request = BatchSyncRequest::new(ids);
        let token = CancellationToken::new();
        let deadline = tokio::time::timeout(
            Duration::from_millis(60),
            fx.engine.batch_sync(&request, &token),
        )
        .await;
        assert!(deadline.is_err(), "batch should outlive the deadline");
        let fetched_at_deadline = fx.remote.fetch_count();

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(fx.remote.fetch_count(), fetched_at_deadline);
        assert!(fx.repository.records().len() < 10);
    }
}
