//! Status history reads.

use legalstat_core::{CancellationToken, HistoryQuery, PatentId, StatusHistoryEvent};

use crate::engine::{guarded, LegalStatusEngine};
use crate::error::EngineError;

impl LegalStatusEngine {
    /// One page of a patent's transition log, newest first.
    ///
    /// `query.page_size` may not exceed `history_max_page_size`; `from`
    /// must not be after `to`.
    #[tracing::instrument(skip(self, token))]
    pub async fn get_status_history(
        &self,
        patent_id: &str,
        query: &HistoryQuery,
        token: &CancellationToken,
    ) -> Result<Vec<StatusHistoryEvent>, EngineError> {
        let patent_id = PatentId::new(patent_id)?;
        query.validate(self.config().history_max_page_size)?;
        guarded(
            token,
            "get_status_history",
            self.ports().repository.get_status_history(&patent_id, query),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, local_record, remote_record};
    use legalstat_core::{Timestamp, ValidationError};

    #[tokio::test]
    async fn transitions_are_listed_newest_first() {
        let fx = fixture();
        let token = CancellationToken::new();
        fx.repository.insert(local_record("US1", "US", "FILED"));

        let mut published = remote_record("US", "PUBLISHED");
        published.effective_date = Timestamp::parse("2025-03-01T00:00:00Z").unwrap();
        fx.remote.set("US1", published);
        fx.engine.sync_status("US1", &token).await.unwrap();

        let mut granted = remote_record("US", "PATENTED CASE");
        granted.effective_date = Timestamp::parse("2025-09-01T00:00:00Z").unwrap();
        fx.remote.set("US1", granted);
        fx.engine.sync_status("US1", &token).await.unwrap();

        let history = fx
            .engine
            .get_status_history("US1", &HistoryQuery::default(), &token)
            .await
            .unwrap();
        let targets: Vec<&str> = history.iter().map(|e| e.to_status.as_str()).collect();
        assert_eq!(targets, vec!["PATENTED CASE", "PUBLISHED"]);
    }

    #[tokio::test]
    async fn oversized_page_is_rejected() {
        let fx = fixture();
        let query = HistoryQuery { page_size: 1000, ..HistoryQuery::default() };
        let err = fx
            .engine
            .get_status_history("US1", &query, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::InvalidPagination(_))
        ));
    }
}
