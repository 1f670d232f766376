//! Cached current-status reads through `legal_status:current:<patentID>`.
//! Sync drops this entry after every completed run, reconciliation whenever it writes.

use legalstat_core::{
    cache_keys, CancellationToken, JurisdictionCode, PatentId, Timestamp, UnifiedStatusCode,
};
use serde::{Deserialize, Serialize};

use crate::engine::{guarded, LegalStatusEngine};
use crate::error::EngineError;

/// Presentation view of one patent's local status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStatusView {
    pub patent_id: PatentId,
    pub jurisdiction: JurisdictionCode,
    pub status: String,
    pub code: UnifiedStatusCode,
    /// `false` when the raw status is not in the jurisdiction's table.
    pub exact_match: bool,
    pub terminal: bool,
    pub previous_status: Option<String>,
    pub effective_date: Timestamp,
    pub next_action: Option<String>,
    pub next_deadline: Option<Timestamp>,
    pub last_sync_at: Option<Timestamp>,
}

impl LegalStatusEngine {
    /// Current status of one patent, served from cache when warm.
    #[tracing::instrument(skip(self, token))]
    pub async fn get_current_status(
        &self,
        patent_id: &str,
        token: &CancellationToken,
    ) -> Result<CurrentStatusView, EngineError> {
        let patent_id = PatentId::new(patent_id)?;
        let key = cache_keys::current(&patent_id);
        if let Some(view) = self.cache_read::<CurrentStatusView>(&key, token).await {
            return Ok(view);
        }

        let record = guarded(
            token,
            "get_local_status",
            self.ports().repository.get_by_patent_id(&patent_id),
        )
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("no local status for {patent_id}")))?;

        let mapped = self.mapper().map_code(&record.jurisdiction, &record.current_status);
        let view = CurrentStatusView {
            patent_id: record.patent_id,
            jurisdiction: record.jurisdiction,
            status: record.current_status,
            code: mapped.code,
            exact_match: mapped.exact_match,
            terminal: mapped.code.is_terminal(),
            previous_status: record.previous_status,
            effective_date: record.effective_date,
            next_action: record.next_action,
            next_deadline: record.next_deadline,
            last_sync_at: record.last_sync_at,
        };
        self.cache_write(&key, &view, self.config().status_cache_ttl(), token)
            .await;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, local_record, remote_record};

    #[tokio::test]
    async fn miss_reads_repository_and_backfills() {
        let fx = fixture();
        fx.repository.insert(local_record("JP1", "JP", "拒絶査定"));

        let view = fx
            .engine
            .get_current_status("JP1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(view.code, UnifiedStatusCode::Rejected);
        assert!(view.exact_match);
        assert!(view.terminal);
        assert!(fx.cache.contains("legal_status:current:JP1"));
    }

    #[tokio::test]
    async fn sync_invalidates_cached_view() {
        let fx = fixture();
        let token = CancellationToken::new();
        fx.repository.insert(local_record("US1", "US", "FILED"));
        let before = fx.engine.get_current_status("US1", &token).await.unwrap();
        assert_eq!(before.code, UnifiedStatusCode::Filed);

        fx.remote.set("US1", remote_record("US", "PATENTED CASE"));
        fx.engine.sync_status("US1", &token).await.unwrap();

        let after = fx.engine.get_current_status("US1", &token).await.unwrap();
        assert_eq!(after.code, UnifiedStatusCode::Granted);
        assert_eq!(after.previous_status.as_deref(), Some("FILED"));
    }

    #[tokio::test]
    async fn untracked_patent_is_not_found() {
        let fx = fixture();
        let err = fx
            .engine
            .get_current_status("KR404", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
    }
}
