//! # Anomaly Detection
//!
//! Four independent rules run over every local record of a portfolio. A
//! record can trip any number of them.
//!
//! | Rule | Severity | Trigger |
//! |------|----------|---------|
//! | UnexpectedLapse | Critical | current code is Lapsed and the previous raw status maps to Granted |
//! | MissedDeadline | Critical / High | deadline at or before now / within the warning window |
//! | StatusConflict | High | remote observation differs from current status and the last sync is older than the grace period |
//! | SyncFailure | Medium | consecutive failures at or above the threshold |
//!
//! Output is stably sorted by severity, so equal-severity anomalies keep
//! detection order.

use legalstat_core::{
    CancellationToken, LocalStatusRecord, PatentId, PortfolioId, Timestamp, UnifiedStatusCode,
};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{guarded, LegalStatusEngine};
use crate::error::EngineError;
use crate::mapper::StatusMapper;
use crate::telemetry;

/// Kind of irregularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    UnexpectedLapse,
    MissedDeadline,
    StatusConflict,
    SyncFailure,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedLapse => "unexpected_lapse",
            Self::MissedDeadline => "missed_deadline",
            Self::StatusConflict => "status_conflict",
            Self::SyncFailure => "sync_failure",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anomaly severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Sort rank: Critical(0) through Info(4).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Info => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected irregularity. Regenerated on every detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAnomaly {
    pub patent_id: PatentId,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    pub detected_at: Timestamp,
    pub suggested_action: String,
}

/// Rule-based classifier over local status records.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    mapper: StatusMapper,
    failure_threshold: u32,
    conflict_grace: chrono::Duration,
    deadline_warning: chrono::Duration,
}

impl AnomalyDetector {
    pub fn new(mapper: StatusMapper, config: &EngineConfig) -> Self {
        Self {
            mapper,
            failure_threshold: config.sync_failure_threshold,
            conflict_grace: config.conflict_grace(),
            deadline_warning: config.deadline_warning(),
        }
    }

    /// Run every rule over `records` as of `now`, most severe first.
    pub fn detect(&self, records: &[LocalStatusRecord], now: Timestamp) -> Vec<StatusAnomaly> {
        let mut found = Vec::new();
        for record in records {
            self.inspect(record, now, &mut found);
        }
        found.sort_by_key(|a| a.severity.rank());
        found
    }

    fn inspect(&self, record: &LocalStatusRecord, now: Timestamp, out: &mut Vec<StatusAnomaly>) {
        let anomaly = |anomaly_type, severity, description: String, action: &str| StatusAnomaly {
            patent_id: record.patent_id.clone(),
            anomaly_type,
            severity,
            description,
            detected_at: now,
            suggested_action: action.to_string(),
        };

        let current = self.mapper.map_code(&record.jurisdiction, &record.current_status).code;
        let previous = record
            .previous_status
            .as_deref()
            .map(|s| self.mapper.map_code(&record.jurisdiction, s).code);
        if current == UnifiedStatusCode::Lapsed && previous == Some(UnifiedStatusCode::Granted) {
            out.push(anomaly(
                AnomalyType::UnexpectedLapse,
                Severity::Critical,
                format!(
                    "granted patent lapsed: {} -> {}",
                    record.previous_status.as_deref().unwrap_or_default(),
                    record.current_status
                ),
                "check maintenance fee payments and consider restoration",
            ));
        }

        if let Some(deadline) = record.next_deadline {
            let remaining = deadline.duration_since(now);
            if remaining <= chrono::Duration::zero() {
                out.push(anomaly(
                    AnomalyType::MissedDeadline,
                    Severity::Critical,
                    format!("deadline {deadline} has passed"),
                    "verify whether the action was taken; file for extension or reinstatement",
                ));
            } else if remaining <= self.deadline_warning {
                out.push(anomaly(
                    AnomalyType::MissedDeadline,
                    Severity::High,
                    format!("deadline {deadline} is {} day(s) away", remaining.num_days()),
                    "complete the pending action before the deadline",
                ));
            }
        }

        if let Some(remote) = record.remote_status.as_deref() {
            let stale = record
                .last_sync_at
                .map_or(true, |synced| now.duration_since(synced) > self.conflict_grace);
            if remote != record.current_status && stale {
                out.push(anomaly(
                    AnomalyType::StatusConflict,
                    Severity::High,
                    format!(
                        "local status {:?} disagrees with office status {remote:?}",
                        record.current_status
                    ),
                    "run a reconciliation for this patent",
                ));
            }
        }

        if record.consecutive_sync_failures >= self.failure_threshold {
            out.push(anomaly(
                AnomalyType::SyncFailure,
                Severity::Medium,
                format!("{} consecutive sync failures", record.consecutive_sync_failures),
                "check connectivity to the office feed and retry the sync",
            ));
        }
    }
}

impl LegalStatusEngine {
    /// Detect anomalies across a portfolio, most severe first.
    pub async fn detect_anomalies(
        &self,
        portfolio_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<StatusAnomaly>, EngineError> {
        let portfolio_id = PortfolioId::new(portfolio_id)?;
        let (_, records) = self.load_portfolio(&portfolio_id, token).await?;
        let anomalies = self.detector().detect(&records, Timestamp::now());
        self.count_anomalies(&anomalies);
        Ok(anomalies)
    }

    /// List a portfolio and read every member's local record. Returns the
    /// member count and the records that exist.
    #[tracing::instrument(skip_all, fields(portfolio_id = %portfolio_id))]
    pub(crate) async fn load_portfolio(
        &self,
        portfolio_id: &PortfolioId,
        token: &CancellationToken,
    ) -> Result<(usize, Vec<LocalStatusRecord>), EngineError> {
        let ports = self.ports();
        let members = guarded(
            token,
            "list_portfolio",
            ports.portfolios.list_by_portfolio(portfolio_id),
        )
        .await?;

        let mut records = Vec::with_capacity(members.len());
        for member in &members {
            match guarded(
                token,
                "get_local_status",
                ports.repository.get_by_patent_id(&member.id),
            )
            .await?
            {
                Some(record) => records.push(record),
                None => tracing::debug!(patent_id = %member.id, "portfolio member has no local record"),
            }
        }
        Ok((members.len(), records))
    }

    pub(crate) fn count_anomalies(&self, anomalies: &[StatusAnomaly]) {
        for anomaly in anomalies {
            self.metrics().inc_counter(
                telemetry::ANOMALIES_TOTAL,
                &[
                    ("type", anomaly.anomaly_type.as_str().to_string()),
                    ("severity", anomaly.severity.as_str().to_string()),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::local_record;
    use chrono::Duration;
    use proptest::prelude::*;

    fn now() -> Timestamp {
        Timestamp::parse("2026-03-01T12:00:00Z").unwrap()
    }

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(StatusMapper::builtin(), &EngineConfig::default())
    }

    fn healthy(id: &str) -> LocalStatusRecord {
        let mut record = local_record(id, "US", "PATENTED CASE");
        record.remote_status = Some("PATENTED CASE".into());
        record.last_sync_at = Some(now());
        record
    }

    fn types(found: &[StatusAnomaly]) -> Vec<(AnomalyType, Severity)> {
        found.iter().map(|a| (a.anomaly_type, a.severity)).collect()
    }

    #[test]
    fn healthy_records_raise_nothing() {
        assert!(detector().detect(&[healthy("US1"), healthy("US2")], now()).is_empty());
        assert!(detector().detect(&[], now()).is_empty());
    }

    #[test]
    fn granted_to_lapsed_is_critical() {
        let mut record = local_record("CN1", "CN", "未缴年费专利权终止");
        record.previous_status = Some("授权".into());
        let found = detector().detect(&[record], now());
        assert_eq!(types(&found), vec![(AnomalyType::UnexpectedLapse, Severity::Critical)]);
    }

    #[test]
    fn lapse_from_non_granted_is_not_flagged() {
        let mut record = local_record("CN1", "CN", "未缴年费专利权终止");
        record.previous_status = Some("实质审查".into());
        assert!(detector().detect(&[record], now()).is_empty());
    }

    #[test]
    fn deadline_thresholds() {
        let d = detector();
        let with_deadline = |offset: Duration| {
            let mut record = healthy("US1");
            record.next_deadline = Some(now().offset_by(offset));
            d.detect(&[record], now())
        };
        assert_eq!(
            types(&with_deadline(Duration::days(-1))),
            vec![(AnomalyType::MissedDeadline, Severity::Critical)]
        );
        assert_eq!(
            types(&with_deadline(Duration::zero())),
            vec![(AnomalyType::MissedDeadline, Severity::Critical)]
        );
        assert_eq!(
            types(&with_deadline(Duration::days(7))),
            vec![(AnomalyType::MissedDeadline, Severity::High)]
        );
        assert!(with_deadline(Duration::days(7) + Duration::seconds(1)).is_empty());
    }

    #[test]
    fn conflict_needs_stale_sync() {
        let d = detector();
        let mut record = healthy("US1");
        record.remote_status = Some("EXPIRED".into());
        record.last_sync_at = Some(now().offset_by(Duration::hours(-2)));
        assert!(d.detect(&[record.clone()], now()).is_empty());

        record.last_sync_at = Some(now().offset_by(Duration::hours(-25)));
        assert_eq!(
            types(&d.detect(&[record.clone()], now())),
            vec![(AnomalyType::StatusConflict, Severity::High)]
        );

        record.last_sync_at = None;
        assert_eq!(d.detect(&[record], now()).len(), 1);
    }

    #[test]
    fn sync_failure_threshold_is_inclusive() {
        let d = detector();
        let mut record = healthy("US1");
        record.consecutive_sync_failures = 2;
        assert!(d.detect(&[record.clone()], now()).is_empty());
        record.consecutive_sync_failures = 3;
        assert_eq!(
            types(&d.detect(&[record], now())),
            vec![(AnomalyType::SyncFailure, Severity::Medium)]
        );
    }

    #[test]
    fn one_record_can_trip_several_rules() {
        let mut record = local_record("JP1", "JP", "年金不納による抹消");
        record.previous_status = Some("登録".into());
        record.remote_status = Some("登録".into());
        record.consecutive_sync_failures = 5;
        record.next_deadline = Some(now().offset_by(Duration::days(3)));
        let found = detector().detect(&[record], now());
        assert_eq!(
            types(&found),
            vec![
                (AnomalyType::UnexpectedLapse, Severity::Critical),
                (AnomalyType::MissedDeadline, Severity::High),
                (AnomalyType::StatusConflict, Severity::High),
                (AnomalyType::SyncFailure, Severity::Medium),
            ]
        );
    }

    #[test]
    fn sort_keeps_detection_order_within_severity() {
        let mut failing = healthy("US1");
        failing.consecutive_sync_failures = 3;
        let mut soon = healthy("US2");
        soon.next_deadline = Some(now().offset_by(Duration::days(2)));
        let mut overdue_a = healthy("US3");
        overdue_a.next_deadline = Some(now().offset_by(Duration::days(-2)));
        let mut overdue_b = healthy("US4");
        overdue_b.next_deadline = Some(now().offset_by(Duration::days(-9)));

        let found = detector().detect(&[failing, soon, overdue_a, overdue_b], now());
        let ids: Vec<&str> = found.iter().map(|a| a.patent_id.as_str()).collect();
        assert_eq!(ids, vec!["US3", "US4", "US2", "US1"]);
    }

    proptest! {
        #[test]
        fn output_is_sorted_by_severity(
            failures in proptest::collection::vec(0u32..6, 1..12),
            offsets in proptest::collection::vec(-20i64..20, 1..12),
        ) {
            let records: Vec<LocalStatusRecord> = failures
                .iter()
                .zip(offsets.iter().cycle())
                .enumerate()
                .map(|(i, (f, days))| {
                    let mut record = healthy(&format!("US{i}"));
                    record.consecutive_sync_failures = *f;
                    record.next_deadline = Some(now().offset_by(Duration::days(*days)));
                    record
                })
                .collect();
            let found = detector().detect(&records, now());
            prop_assert!(found.windows(2).all(|w| w[0].severity.rank() <= w[1].severity.rank()));
        }
    }
}
