//! # Portfolio Summary
//!
//! Status and jurisdiction histograms, latest sync time, anomalies and the
//! health score of one portfolio. Cached under
//! `legal_status:summary:<portfolioID>` for the summary TTL.

use std::collections::BTreeMap;

use legalstat_core::{cache_keys, CancellationToken, PortfolioId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::anomaly::StatusAnomaly;
use crate::engine::LegalStatusEngine;
use crate::error::EngineError;
use crate::health::health_score;
use crate::telemetry;

/// Aggregate view of a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub portfolio_id: PortfolioId,
    /// Members listed for the portfolio, tracked or not.
    pub total_patents: usize,
    /// Unified code (`GRANTED`, ...) to record count.
    pub by_status: BTreeMap<String, usize>,
    /// Jurisdiction code to record count.
    pub by_jurisdiction: BTreeMap<String, usize>,
    pub last_sync_at: Option<Timestamp>,
    pub anomaly_count: usize,
    pub anomalies: Vec<StatusAnomaly>,
    pub health_score: f64,
    pub generated_at: Timestamp,
}

impl LegalStatusEngine {
    /// Cached portfolio summary.
    #[tracing::instrument(skip(self, token))]
    pub async fn get_status_summary(
        &self,
        portfolio_id: &str,
        token: &CancellationToken,
    ) -> Result<StatusSummary, EngineError> {
        let portfolio_id = PortfolioId::new(portfolio_id)?;
        let key = cache_keys::summary(&portfolio_id);

        if let Some(cached) = self.cache_read::<StatusSummary>(&key, token).await {
            self.metrics().inc_counter(
                telemetry::SUMMARY_CACHE_TOTAL,
                &[("result", "hit".to_string())],
            );
            return Ok(cached);
        }
        self.metrics().inc_counter(
            telemetry::SUMMARY_CACHE_TOTAL,
            &[("result", "miss".to_string())],
        );

        let (total_patents, records) = self.load_portfolio(&portfolio_id, token).await?;

        let mut by_status = BTreeMap::new();
        let mut by_jurisdiction = BTreeMap::new();
        let mut last_sync_at: Option<Timestamp> = None;
        for record in &records {
            let code = self.mapper().map_code(&record.jurisdiction, &record.current_status).code;
            *by_status.entry(code.as_str().to_string()).or_insert(0) += 1;
            *by_jurisdiction
                .entry(record.jurisdiction.to_string())
                .or_insert(0) += 1;
            last_sync_at = last_sync_at.max(record.last_sync_at);
        }

        let now = Timestamp::now();
        let anomalies = self.detector().detect(&records, now);
        self.count_anomalies(&anomalies);

        let summary = StatusSummary {
            portfolio_id,
            total_patents,
            by_status,
            by_jurisdiction,
            last_sync_at,
            anomaly_count: anomalies.len(),
            health_score: health_score(&anomalies, total_patents),
            anomalies,
            generated_at: now,
        };
        self.cache_write(&key, &summary, self.config().summary_cache_ttl(), token)
            .await;
        Ok(summary)
    }
}
