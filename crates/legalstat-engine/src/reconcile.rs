//! # Reconciliation
//!
//! Field-level comparison of the local record against the office record.
//! Status, effective date and next action mismatches resolve to
//! `update_local`; a jurisdiction mismatch resolves to `investigate`.
//!
//! When anything differs, the remote status and effective date are written
//! to the local record and the current-status cache entry is dropped. A
//! failed write is reported in [`ReconcileResult::fix_error`]; the
//! discrepancy report is returned either way.

use legalstat_core::{
    cache_keys, CancellationToken, LocalStatusRecord, PatentId, RemoteStatusRecord,
    StatusHistoryEvent, Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::engine::{guarded, LegalStatusEngine};
use crate::error::EngineError;
use crate::telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyField {
    Status,
    Jurisdiction,
    EffectiveDate,
    NextAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    UpdateLocal,
    Investigate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub field: DiscrepancyField,
    pub local_value: Option<String>,
    pub remote_value: Option<String>,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub patent_id: PatentId,
    pub consistent: bool,
    pub discrepancies: Vec<Discrepancy>,
    /// Remote status and effective date were written locally.
    pub auto_fixed: bool,
    /// Why the write failed, when it did.
    pub fix_error: Option<String>,
    pub reconciled_at: Timestamp,
}

/// Compare the four reconciled fields. Pure.
pub fn diff_records(local: &LocalStatusRecord, remote: &RemoteStatusRecord) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    let mut check = |field, local_value: Option<String>, remote_value: Option<String>, resolution| {
        if local_value != remote_value {
            out.push(Discrepancy {
                field,
                local_value,
                remote_value,
                resolution,
            });
        }
    };
    check(
        DiscrepancyField::Status,
        Some(local.current_status.clone()),
        Some(remote.status.clone()),
        Resolution::UpdateLocal,
    );
    check(
        DiscrepancyField::Jurisdiction,
        Some(local.jurisdiction.to_string()),
        Some(remote.jurisdiction.to_string()),
        Resolution::Investigate,
    );
    check(
        DiscrepancyField::EffectiveDate,
        Some(local.effective_date.to_iso8601()),
        Some(remote.effective_date.to_iso8601()),
        Resolution::UpdateLocal,
    );
    check(
        DiscrepancyField::NextAction,
        local.next_action.clone(),
        remote.next_action.clone(),
        Resolution::UpdateLocal,
    );
    out
}

impl LegalStatusEngine {
    /// Reconcile one patent against the office record.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the patent has no local record;
    /// [`EngineError::Internal`] when either read fails.
    #[tracing::instrument(skip(self, token))]
    pub async fn reconcile_status(
        &self,
        patent_id: &str,
        token: &CancellationToken,
    ) -> Result<ReconcileResult, EngineError> {
        let patent_id = PatentId::new(patent_id)?;
        let repository = &self.ports().repository;

        let local = guarded(
            token,
            "get_local_status",
            repository.get_by_patent_id(&patent_id),
        )
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("no local status for {patent_id}")))?;

        let remote = guarded(
            token,
            "fetch_remote_status",
            self.ports().remote.fetch_remote_status(&patent_id),
        )
        .await?;

        self.best_effort(
            "record_remote_observation",
            patent_id.as_str(),
            token,
            repository.record_remote_observation(&patent_id, &remote.status),
        )
        .await;

        let discrepancies = diff_records(&local, &remote);
        let consistent = discrepancies.is_empty();
        let mut auto_fixed = false;
        let mut fix_error = None;

        if !consistent {
            match self.apply_remote(&local, &remote, token).await {
                Ok(()) => auto_fixed = true,
                Err(e) => {
                    tracing::warn!(error = %e, "reconciliation auto-fix failed");
                    fix_error = Some(e.to_string());
                }
            }
        }

        self.metrics().inc_counter(
            telemetry::RECONCILE_TOTAL,
            &[("consistent", telemetry::flag(consistent))],
        );
        tracing::info!(
            consistent,
            discrepancies = discrepancies.len(),
            auto_fixed,
            "reconciliation finished"
        );

        Ok(ReconcileResult {
            patent_id,
            consistent,
            discrepancies,
            auto_fixed,
            fix_error,
            reconciled_at: Timestamp::now(),
        })
    }

    async fn apply_remote(
        &self,
        local: &LocalStatusRecord,
        remote: &RemoteStatusRecord,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        let ports = self.ports();
        let patent_id = &local.patent_id;
        guarded(
            token,
            "update_status",
            ports
                .repository
                .update_status(patent_id, &remote.status, remote.effective_date),
        )
        .await?;

        if local.current_status != remote.status {
            let event = StatusHistoryEvent::transition(
                patent_id.clone(),
                Some(local.current_status.clone()),
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
        }

        self.cache_invalidate(vec![cache_keys::current(patent_id)], token)
            .await;
        Ok(())
    }
}
