//! # Ports
//!
//! Abstract interfaces the engine consumes. Concrete wire formats and
//! storage engines are out of scope here; production deployments implement
//! these traits against their database, cache, message bus and office
//! feeds, while tests use the in-memory adapters in `legalstat-adapters`.
//!
//! All traits are object-safe and `Send + Sync` so the engine can hold
//! them as `Arc<dyn _>` and share them across worker tasks.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PortError;
use crate::identity::{PatentId, PortfolioId, SubscriptionId};
use crate::record::{
    HistoryQuery, LocalStatusRecord, PatentSummary, RemoteStatusRecord, StatusHistoryEvent,
};
use crate::subscription::Subscription;
use crate::temporal::Timestamp;

/// Local status storage, history log and subscription persistence.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Fetch the local record, `Ok(None)` when the patent is not tracked.
    async fn get_by_patent_id(
        &self,
        patent_id: &PatentId,
    ) -> Result<Option<LocalStatusRecord>, PortError>;

    /// Insert the first record of a newly tracked patent.
    async fn create(&self, record: &LocalStatusRecord) -> Result<(), PortError>;

    /// Write a new current status and effective date.
    ///
    /// When `status` differs from the stored current status, the stored
    /// value moves to `previous_status`; an unchanged status only updates
    /// the effective date. Returns [`PortError::NotFound`] for an untracked
    /// patent.
    async fn update_status(
        &self,
        patent_id: &PatentId,
        status: &str,
        effective_date: Timestamp,
    ) -> Result<(), PortError>;

    /// Remember the latest raw status observed from the authority.
    async fn record_remote_observation(
        &self,
        patent_id: &PatentId,
        remote_status: &str,
    ) -> Result<(), PortError>;

    /// Stamp a completed sync and reset the consecutive-failure counter.
    async fn record_sync_success(
        &self,
        patent_id: &PatentId,
        synced_at: Timestamp,
    ) -> Result<(), PortError>;

    /// Increment the consecutive-failure counter, returning the new value.
    async fn record_sync_failure(&self, patent_id: &PatentId) -> Result<u32, PortError>;

    /// Append one immutable history event.
    async fn append_history(&self, event: &StatusHistoryEvent) -> Result<(), PortError>;

    /// History of one patent, newest first, filtered and paginated by `query`.
    async fn get_status_history(
        &self,
        patent_id: &PatentId,
        query: &HistoryQuery,
    ) -> Result<Vec<StatusHistoryEvent>, PortError>;

    /// Persist a new subscription.
    async fn save_subscription(&self, subscription: &Subscription) -> Result<(), PortError>;

    /// Mark a subscription inactive. Deactivating an inactive subscription
    /// succeeds; an unknown ID is [`PortError::NotFound`].
    async fn deactivate_subscription(&self, id: &SubscriptionId) -> Result<(), PortError>;
}

/// Portfolio membership lookup.
#[async_trait]
pub trait PortfolioDirectory: Send + Sync {
    /// All patents belonging to a portfolio. Unknown portfolios are empty.
    async fn list_by_portfolio(
        &self,
        portfolio_id: &PortfolioId,
    ) -> Result<Vec<PatentSummary>, PortError>;
}

/// Authoritative remote status source. Jurisdiction is resolved by the
/// implementation from the patent ID.
#[async_trait]
pub trait RemoteStatusSource: Send + Sync {
    /// Fetch the office's current view of one patent.
    async fn fetch_remote_status(
        &self,
        patent_id: &PatentId,
    ) -> Result<RemoteStatusRecord, PortError>;

    /// Human-readable implementation name (e.g. `"MockRemoteStatusSource"`).
    fn source_name(&self) -> &str;
}

/// TTL key/value cache holding JSON documents.
#[async_trait]
pub trait StatusCache: Send + Sync {
    /// `Ok(None)` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PortError>;

    /// Store `value` for `ttl`.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration)
        -> Result<(), PortError>;

    /// Remove keys. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), PortError>;
}

/// Fire-and-forget event publication.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` on `topic`, partitioned by `key`.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), PortError>;
}

/// Counter and histogram sink. Infallible by contract.
pub trait MetricsSink: Send + Sync {
    /// Increment a counter by one.
    fn inc_counter(&self, name: &str, labels: &[(&'static str, String)]);

    /// Record one histogram observation.
    fn observe_histogram(&self, name: &str, value: f64, labels: &[(&'static str, String)]);
}
