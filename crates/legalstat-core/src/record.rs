//! # Status Records
//!
//! Data carried across the engine's ports:
//!
//! - [`LocalStatusRecord`]: the locally persisted per-patent row.
//! - [`RemoteStatusRecord`]: what the authoritative office reports.
//! - [`StatusHistoryEvent`]: append-only transition log entry.
//! - [`StatusChangeEvent`]: payload published on every detected change.
//! - [`PatentSummary`]: portfolio membership entry.
//! - [`HistoryQuery`]: pagination and date window for history reads.
//!
//! Raw status strings are stored exactly as the office reported them. The
//! unified code is derived on read by the status mapper and never stored.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{EventId, JurisdictionCode, PatentId};
use crate::temporal::Timestamp;

/// Locally persisted legal status of one patent.
///
/// Created on the first sync of a newly tracked patent and updated on
/// every detected transition. Only the sync engine and the reconciler
/// mutate it; the engine never deletes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalStatusRecord {
    pub patent_id: PatentId,
    pub jurisdiction: JurisdictionCode,
    /// Raw status written by the last successful sync.
    pub current_status: String,
    /// Raw status before the last transition.
    #[serde(default)]
    pub previous_status: Option<String>,
    /// Last raw status observed from the authority. May be newer than
    /// `current_status` when a sync failed after the remote fetch.
    #[serde(default)]
    pub remote_status: Option<String>,
    pub effective_date: Timestamp,
    #[serde(default)]
    pub next_action: Option<String>,
    #[serde(default)]
    pub next_deadline: Option<Timestamp>,
    #[serde(default)]
    pub last_sync_at: Option<Timestamp>,
    #[serde(default)]
    pub consecutive_sync_failures: u32,
    #[serde(default)]
    pub raw_payload: serde_json::Value,
}

impl LocalStatusRecord {
    /// Build the initial local record for a patent seen for the first time.
    pub fn from_remote(patent_id: PatentId, remote: &RemoteStatusRecord) -> Self {
        Self {
            patent_id,
            jurisdiction: remote.jurisdiction.clone(),
            current_status: remote.status.clone(),
            previous_status: None,
            remote_status: Some(remote.status.clone()),
            effective_date: remote.effective_date,
            next_action: remote.next_action.clone(),
            next_deadline: remote.next_deadline,
            last_sync_at: None,
            consecutive_sync_failures: 0,
            raw_payload: remote.raw_payload.clone(),
        }
    }
}

/// Status as reported by the authoritative patent-office source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStatusRecord {
    pub status: String,
    pub jurisdiction: JurisdictionCode,
    pub effective_date: Timestamp,
    #[serde(default)]
    pub next_action: Option<String>,
    #[serde(default)]
    pub next_deadline: Option<Timestamp>,
    /// Issuing office or feed name (e.g. `"CNIPA"`, `"USPTO"`, `"mock"`).
    pub source: String,
    #[serde(default)]
    pub raw_payload: serde_json::Value,
}

/// One detected status transition. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEvent {
    pub event_id: EventId,
    pub patent_id: PatentId,
    /// `None` for the first observation of a newly tracked patent.
    pub from_status: Option<String>,
    pub to_status: String,
    pub event_date: Timestamp,
    pub source: String,
    pub description: String,
}

impl StatusHistoryEvent {
    /// Record a transition with a freshly generated event ID.
    pub fn transition(
        patent_id: PatentId,
        from_status: Option<String>,
        to_status: impl Into<String>,
        event_date: Timestamp,
        source: impl Into<String>,
    ) -> Self {
        let to_status = to_status.into();
        let description = match &from_status {
            Some(from) => format!("status changed from {from} to {to_status}"),
            None => format!("tracking started with status {to_status}"),
        };
        Self {
            event_id: EventId::new(),
            patent_id,
            from_status,
            to_status,
            event_date,
            source: source.into(),
            description,
        }
    }
}

/// Payload published to the change topic, keyed by patent ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub patent_id: PatentId,
    pub previous_status: Option<String>,
    pub current_status: String,
    pub changed_at: Timestamp,
    pub source: String,
}

/// Portfolio membership entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentSummary {
    pub id: PatentId,
}

/// Pagination and optional date window for history reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// One-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub from: Option<Timestamp>,
    #[serde(default)]
    pub to: Option<Timestamp>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            from: None,
            to: None,
        }
    }
}

impl HistoryQuery {
    /// Check page bounds and window ordering.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidPagination`] when `page` is zero or
    /// `page_size` is outside `1..=max_page_size`;
    /// [`ValidationError::InvalidDateRange`] when `from` is after `to`.
    pub fn validate(&self, max_page_size: u32) -> Result<(), ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::InvalidPagination(
                "page must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > max_page_size {
            return Err(ValidationError::InvalidPagination(format!(
                "page_size must be between 1 and {max_page_size}, got {}",
                self.page_size
            )));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::InvalidDateRange {
                    from: from.to_iso8601(),
                    to: to.to_iso8601(),
                });
            }
        }
        Ok(())
    }

    /// Number of items to skip before the requested page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }

    /// Whether `at` falls inside the optional window (inclusive bounds).
    pub fn contains(&self, at: Timestamp) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}
