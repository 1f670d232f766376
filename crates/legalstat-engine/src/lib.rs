//! # legalstat-engine: Legal-Status Sync and Reconciliation
//!
//! Keeps locally stored patent legal status in line with the patent
//! offices, and reports on what it finds.
//!
//! ## Components
//!
//! | Module | Operation |
//! |--------|-----------|
//! | [`mapper`] | office wording → [`UnifiedStatusCode`](legalstat_core::UnifiedStatusCode) |
//! | [`sync`] | `sync_status`: one patent against the authority |
//! | [`batch`] | `batch_sync`: many patents under a concurrency cap |
//! | [`anomaly`] | `detect_anomalies`: rule-based irregularity scan |
//! | [`health`] | `health_score`: per-capita severity burden |
//! | [`summary`] | `get_status_summary`: cached portfolio histograms |
//! | [`reconcile`] | `reconcile_status`: field diff plus auto-apply |
//! | [`subscription`] | `subscribe` / `unsubscribe` |
//! | [`history`], [`current`] | history pages and cached current status |
//!
//! ## Error Policy
//!
//! Local reads, remote fetches and status writes are the critical path:
//! their failures are returned as [`EngineError::Internal`]. Event
//! publication, cache writes, history appends and sync bookkeeping are
//! best-effort: failures are logged with `tracing` and counted under
//! `legal_status_side_effect_failures_total`, and never change the result.
//!
//! Every operation takes a [`CancellationToken`](legalstat_core::CancellationToken)
//! raced against each critical port call.

pub mod anomaly;
pub mod batch;
mod cache;
pub mod config;
pub mod current;
pub mod engine;
pub mod error;
pub mod health;
pub mod history;
pub mod mapper;
pub mod reconcile;
pub mod subscription;
pub mod summary;
pub mod sync;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use anomaly::{AnomalyDetector, AnomalyType, Severity, StatusAnomaly};
pub use batch::{BatchItemError, BatchSyncRequest, BatchSyncResult};
pub use config::{ConfigError, EngineConfig};
pub use current::CurrentStatusView;
pub use engine::{EnginePorts, LegalStatusEngine};
pub use error::EngineError;
pub use health::health_score;
pub use mapper::{MappedStatus, StatusMapper, StatusTables};
pub use reconcile::{diff_records, Discrepancy, DiscrepancyField, ReconcileResult, Resolution};
pub use summary::StatusSummary;
pub use sync::SyncResult;
