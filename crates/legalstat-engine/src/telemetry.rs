//! Metric names emitted through the [`MetricsSink`](legalstat_core::MetricsSink) port.

/// Completed sync runs. Labels: `changed`.
pub const SYNC_TOTAL: &str = "legal_status_sync_total";
/// Wall time of one sync run. Labels: `changed`.
pub const SYNC_DURATION_SECONDS: &str = "legal_status_sync_duration_seconds";
/// Sync runs aborted on the critical path. Labels: `stage`.
pub const SYNC_FAILURES_TOTAL: &str = "legal_status_sync_failures_total";
/// Batch calls. Labels: `outcome` (`success`, `partial`, `failure`).
pub const BATCH_TOTAL: &str = "legal_status_batch_total";
/// Wall time of one batch call.
pub const BATCH_DURATION_SECONDS: &str = "legal_status_batch_duration_seconds";
/// Detected anomalies. Labels: `type`, `severity`.
pub const ANOMALIES_TOTAL: &str = "legal_status_anomalies_total";
/// Reconciliations. Labels: `consistent`.
pub const RECONCILE_TOTAL: &str = "legal_status_reconcile_total";
/// Swallowed failures of best-effort side effects. Labels: `effect`.
pub const SIDE_EFFECT_FAILURES_TOTAL: &str = "legal_status_side_effect_failures_total";
/// Summary cache lookups. Labels: `result` (`hit`, `miss`).
pub const SUMMARY_CACHE_TOTAL: &str = "legal_status_summary_cache_total";

pub(crate) fn flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}
