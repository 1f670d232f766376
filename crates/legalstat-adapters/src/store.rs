//! In-memory repository and portfolio directory backed by `DashMap`.
//!
//! Used by tests and by the CLI's fixture mode. Both types can be told to
//! fail so callers can exercise error paths, and the repository keeps a log
//! of status writes.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use legalstat_core::{
    HistoryQuery, LocalStatusRecord, PatentId, PatentSummary, PortError, PortfolioDirectory,
    PortfolioId, StatusHistoryEvent, StatusRepository, Subscription, SubscriptionId, Timestamp,
    ValidationError,
};
use parking_lot::Mutex;

/// `StatusRepository` over concurrent hash maps.
#[derive(Debug, Default)]
pub struct InMemoryStatusRepository {
    records: DashMap<PatentId, LocalStatusRecord>,
    history: DashMap<PatentId, Vec<StatusHistoryEvent>>,
    subscriptions: DashMap<SubscriptionId, Subscription>,
    status_updates: Mutex<Vec<(String, String)>>,
    fail_reads: AtomicBool,
    fail_updates: AtomicBool,
}

impl InMemoryStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: LocalStatusRecord) {
        self.records.insert(record.patent_id.clone(), record);
    }

    pub fn get(&self, patent_id: &str) -> Option<LocalStatusRecord> {
        let id = PatentId::new(patent_id).ok()?;
        self.records.get(&id).map(|r| r.value().clone())
    }

    /// Every stored record, ordered by patent ID.
    pub fn records(&self) -> Vec<LocalStatusRecord> {
        let mut all: Vec<LocalStatusRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.patent_id.cmp(&b.patent_id));
        all
    }

    /// History of one patent in append order.
    pub fn history(&self, patent_id: &str) -> Vec<StatusHistoryEvent> {
        PatentId::new(patent_id)
            .ok()
            .and_then(|id| self.history.get(&id).map(|h| h.value().clone()))
            .unwrap_or_default()
    }

    /// Every history event, grouped by patent in ID order.
    pub fn all_history(&self) -> Vec<StatusHistoryEvent> {
        let mut grouped: Vec<(PatentId, Vec<StatusHistoryEvent>)> = self
            .history
            .iter()
            .map(|h| (h.key().clone(), h.value().clone()))
            .collect();
        grouped.sort_by(|a, b| a.0.cmp(&b.0));
        grouped.into_iter().flat_map(|(_, events)| events).collect()
    }

    pub fn subscription(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.subscriptions.get(id).map(|s| s.value().clone())
    }

    /// Every subscription, oldest first.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut all: Vec<Subscription> =
            self.subscriptions.iter().map(|s| s.value().clone()).collect();
        all.sort_by_key(|s| s.created_at);
        all
    }

    /// `(patent_id, status)` of every successful `update_status` call.
    pub fn status_updates(&self) -> Vec<(String, String)> {
        self.status_updates.lock().clone()
    }

    /// Make `get_by_patent_id` fail with `Unavailable`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `update_status` fail with `Unavailable`.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    fn with_record<T>(
        &self,
        patent_id: &PatentId,
        f: impl FnOnce(&mut LocalStatusRecord) -> T,
    ) -> Result<T, PortError> {
        let mut entry = self
            .records
            .get_mut(patent_id)
            .ok_or_else(|| PortError::NotFound(format!("patent {patent_id}")))?;
        Ok(f(entry.value_mut()))
    }
}

#[async_trait]
impl StatusRepository for InMemoryStatusRepository {
    async fn get_by_patent_id(
        &self,
        patent_id: &PatentId,
    ) -> Result<Option<LocalStatusRecord>, PortError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("repository reads disabled".into()));
        }
        Ok(self.records.get(patent_id).map(|r| r.value().clone()))
    }

    async fn create(&self, record: &LocalStatusRecord) -> Result<(), PortError> {
        use dashmap::mapref::entry::Entry;
        match self.records.entry(record.patent_id.clone()) {
            Entry::Occupied(_) => Err(PortError::Rejected(format!(
                "patent {} is already tracked",
                record.patent_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn update_status(
        &self,
        patent_id: &PatentId,
        status: &str,
        effective_date: Timestamp,
    ) -> Result<(), PortError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("repository writes disabled".into()));
        }
        self.with_record(patent_id, |record| {
            if record.current_status != status {
                record.previous_status =
                    Some(std::mem::replace(&mut record.current_status, status.to_string()));
            }
            record.effective_date = effective_date;
        })?;
        self.status_updates
            .lock()
            .push((patent_id.to_string(), status.to_string()));
        Ok(())
    }

    async fn record_remote_observation(
        &self,
        patent_id: &PatentId,
        remote_status: &str,
    ) -> Result<(), PortError> {
        self.with_record(patent_id, |record| {
            record.remote_status = Some(remote_status.to_string());
        })
    }

    async fn record_sync_success(
        &self,
        patent_id: &PatentId,
        synced_at: Timestamp,
    ) -> Result<(), PortError> {
        self.with_record(patent_id, |record| {
            record.last_sync_at = Some(synced_at);
            record.consecutive_sync_failures = 0;
        })
    }

    async fn record_sync_failure(&self, patent_id: &PatentId) -> Result<u32, PortError> {
        self.with_record(patent_id, |record| {
            record.consecutive_sync_failures = record.consecutive_sync_failures.saturating_add(1);
            record.consecutive_sync_failures
        })
    }

    async fn append_history(&self, event: &StatusHistoryEvent) -> Result<(), PortError> {
        self.history
            .entry(event.patent_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn get_status_history(
        &self,
        patent_id: &PatentId,
        query: &HistoryQuery,
    ) -> Result<Vec<StatusHistoryEvent>, PortError> {
        let mut events: Vec<StatusHistoryEvent> = self
            .history
            .get(patent_id)
            .map(|h| h.value().iter().rev().filter(|e| query.contains(e.event_date)).cloned().collect())
            .unwrap_or_default();
        // Stable: later appends stay ahead of earlier ones on equal dates.
        events.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(events
            .into_iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .collect())
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<(), PortError> {
        self.subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn deactivate_subscription(&self, id: &SubscriptionId) -> Result<(), PortError> {
        let mut entry = self
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| PortError::NotFound(format!("subscription {id}")))?;
        entry.value_mut().active = false;
        Ok(())
    }
}

/// `PortfolioDirectory` over a concurrent hash map.
#[derive(Debug, Default)]
pub struct InMemoryPortfolioDirectory {
    portfolios: DashMap<PortfolioId, Vec<PatentId>>,
    fail: AtomicBool,
}

impl InMemoryPortfolioDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the members of `portfolio_id`.
    pub fn assign<I, S>(&self, portfolio_id: &str, patent_ids: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let portfolio = PortfolioId::new(portfolio_id)?;
        let members = patent_ids
            .into_iter()
            .map(|id| PatentId::new(id.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.portfolios.insert(portfolio, members);
        Ok(())
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PortfolioDirectory for InMemoryPortfolioDirectory {
    async fn list_by_portfolio(
        &self,
        portfolio_id: &PortfolioId,
    ) -> Result<Vec<PatentSummary>, PortError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("portfolio directory disabled".into()));
        }
        Ok(self
            .portfolios
            .get(portfolio_id)
            .map(|members| {
                members
                    .iter()
                    .map(|id| PatentSummary { id: id.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legalstat_core::{JurisdictionCode, NotificationChannel, SubscribeRequest};

    fn record(id: &str, status: &str) -> LocalStatusRecord {
        LocalStatusRecord {
            patent_id: PatentId::new(id).unwrap(),
            jurisdiction: JurisdictionCode::new("US").unwrap(),
            current_status: status.into(),
            previous_status: None,
            remote_status: None,
            effective_date: Timestamp::parse("2025-01-01T00:00:00Z").unwrap(),
            next_action: None,
            next_deadline: None,
            last_sync_at: None,
            consecutive_sync_failures: 0,
            raw_payload: serde_json::Value::Null,
        }
    }

    fn id(s: &str) -> PatentId {
        PatentId::new(s).unwrap()
    }

    #[tokio::test]
    async fn update_rotates_previous_status_only_on_change() {
        let repo = InMemoryStatusRepository::new();
        repo.insert(record("US1", "FILED"));
        let date = Timestamp::parse("2025-05-01T00:00:00Z").unwrap();

        repo.update_status(&id("US1"), "FILED", date).await.unwrap();
        assert_eq!(repo.get("US1").unwrap().previous_status, None);
        assert_eq!(repo.get("US1").unwrap().effective_date, date);

        repo.update_status(&id("US1"), "PUBLISHED", date).await.unwrap();
        let stored = repo.get("US1").unwrap();
        assert_eq!(stored.current_status, "PUBLISHED");
        assert_eq!(stored.previous_status.as_deref(), Some("FILED"));
    }

    #[tokio::test]
    async fn update_of_untracked_patent_is_not_found() {
        let repo = InMemoryStatusRepository::new();
        let err = repo
            .update_status(&id("US9"), "FILED", Timestamp::now())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(repo.status_updates().is_empty());
    }

    #[tokio::test]
    async fn create_refuses_duplicates() {
        let repo = InMemoryStatusRepository::new();
        repo.create(&record("US1", "FILED")).await.unwrap();
        let err = repo.create(&record("US1", "FILED")).await.unwrap_err();
        assert!(matches!(err, PortError::Rejected(_)));
    }

    #[tokio::test]
    async fn failure_counter_increments_and_resets() {
        let repo = InMemoryStatusRepository::new();
        repo.insert(record("US1", "FILED"));
        assert_eq!(repo.record_sync_failure(&id("US1")).await.unwrap(), 1);
        assert_eq!(repo.record_sync_failure(&id("US1")).await.unwrap(), 2);
        repo.record_sync_success(&id("US1"), Timestamp::now()).await.unwrap();
        assert_eq!(repo.get("US1").unwrap().consecutive_sync_failures, 0);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_paginated() {
        let repo = InMemoryStatusRepository::new();
        for (i, status) in ["FILED", "PUBLISHED", "PATENTED CASE"].iter().enumerate() {
            let date = Timestamp::parse(&format!("2025-0{}-01T00:00:00Z", i + 1)).unwrap();
            let event = StatusHistoryEvent::transition(id("US1"), None, *status, date, "USPTO");
            repo.append_history(&event).await.unwrap();
        }

        let first = HistoryQuery { page: 1, page_size: 2, ..HistoryQuery::default() };
        let page = repo.get_status_history(&id("US1"), &first).await.unwrap();
        let got: Vec<&str> = page.iter().map(|e| e.to_status.as_str()).collect();
        assert_eq!(got, vec!["PATENTED CASE", "PUBLISHED"]);

        let second = HistoryQuery { page: 2, ..first.clone() };
        let page = repo.get_status_history(&id("US1"), &second).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].to_status, "FILED");

        let window = HistoryQuery {
            from: Some(Timestamp::parse("2025-02-01T00:00:00Z").unwrap()),
            to: Some(Timestamp::parse("2025-02-28T00:00:00Z").unwrap()),
            ..HistoryQuery::default()
        };
        let page = repo.get_status_history(&id("US1"), &window).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].to_status, "PUBLISHED");
    }

    #[tokio::test]
    async fn deactivation_is_idempotent_but_unknown_ids_fail() {
        let repo = InMemoryStatusRepository::new();
        let request = SubscribeRequest {
            patent_ids: vec![id("US1")],
            portfolio_id: None,
            status_filters: vec![],
            channels: vec![NotificationChannel::InApp],
            recipient: "ops".into(),
        };
        let sub = Subscription::from_request(request, Timestamp::now());
        repo.save_subscription(&sub).await.unwrap();

        repo.deactivate_subscription(&sub.id).await.unwrap();
        repo.deactivate_subscription(&sub.id).await.unwrap();
        assert!(!repo.subscription(&sub.id).unwrap().active);

        let err = repo
            .deactivate_subscription(&SubscriptionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn portfolio_listing() {
        let dir = InMemoryPortfolioDirectory::new();
        dir.assign("pf", ["US1", "CN2"]).unwrap();
        let members = dir
            .list_by_portfolio(&PortfolioId::new("pf").unwrap())
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
        let unknown = dir
            .list_by_portfolio(&PortfolioId::new("nope").unwrap())
            .await
            .unwrap();
        assert!(unknown.is_empty());
        assert!(dir.assign("pf", [""]).is_err());
    }
}
