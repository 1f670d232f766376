//! Scriptable remote status source for tests and fixture runs.
//!
//! Records and failures are set per patent. An optional delay holds each
//! fetch open so callers can observe how many run at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use legalstat_core::{PatentId, PortError, RemoteStatusRecord, RemoteStatusSource};
use parking_lot::Mutex;

/// In-memory `RemoteStatusSource`.
#[derive(Debug, Default)]
pub struct MockRemoteStatusSource {
    records: DashMap<String, RemoteStatusRecord>,
    failures: DashMap<String, PortError>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockRemoteStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer fetches of `patent_id` with `record`, clearing any failure.
    pub fn set(&self, patent_id: &str, record: RemoteStatusRecord) {
        let key = patent_id.trim().to_string();
        self.failures.remove(&key);
        self.records.insert(key, record);
    }

    /// Answer fetches of `patent_id` with `error`.
    pub fn fail_for(&self, patent_id: &str, error: PortError) {
        self.failures.insert(patent_id.trim().to_string(), error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStatusSource for MockRemoteStatusSource {
    async fn fetch_remote_status(
        &self,
        patent_id: &PatentId,
    ) -> Result<RemoteStatusRecord, PortError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.get(patent_id.as_str()) {
            return Err(error.value().clone());
        }
        self.records
            .get(patent_id.as_str())
            .map(|r| r.value().clone())
            .ok_or_else(|| PortError::NotFound(format!("no office record for {patent_id}")))
    }

    fn source_name(&self) -> &str {
        "mock"
    }
}
