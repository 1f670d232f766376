//! # Engine Handle
//!
//! [`LegalStatusEngine`] owns the ports, configuration, mapper and anomaly
//! detector. It is a cheap `Arc` handle: clones share state, which lets
//! batch workers run on their own tasks.
//!
//! Port calls go through two helpers that encode the error policy:
//!
//! - [`guarded`] for the critical path: raced against the caller's
//!   cancellation token, failures become [`EngineError::Internal`].
//! - [`LegalStatusEngine::best_effort`] for side effects: failures are
//!   logged and counted, never returned.

use std::future::Future;
use std::sync::Arc;

use legalstat_core::{
    CancellationToken, EventPublisher, MetricsSink, PortError, PortfolioDirectory,
    RemoteStatusSource, StatusCache, StatusRepository,
};

use crate::anomaly::AnomalyDetector;
use crate::config::{ConfigError, EngineConfig};
use crate::error::EngineError;
use crate::mapper::{StatusMapper, StatusTables};
use crate::telemetry;

/// The set of ports the engine consumes.
#[derive(Clone)]
pub struct EnginePorts {
    pub repository: Arc<dyn StatusRepository>,
    pub portfolios: Arc<dyn PortfolioDirectory>,
    pub remote: Arc<dyn RemoteStatusSource>,
    pub cache: Arc<dyn StatusCache>,
    pub publisher: Arc<dyn EventPublisher>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for EnginePorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePorts")
            .field("remote", &self.remote.source_name())
            .finish_non_exhaustive()
    }
}

pub(crate) struct EngineInner {
    pub(crate) ports: EnginePorts,
    pub(crate) config: EngineConfig,
    pub(crate) mapper: StatusMapper,
    pub(crate) detector: AnomalyDetector,
}

/// Legal-status synchronization and reconciliation engine.
#[derive(Clone)]
pub struct LegalStatusEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl std::fmt::Debug for LegalStatusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegalStatusEngine")
            .field("ports", &self.inner.ports)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl LegalStatusEngine {
    /// Build an engine. The configuration is validated here; the tables are
    /// shared with the mapper and the anomaly detector.
    pub fn new(
        ports: EnginePorts,
        config: EngineConfig,
        tables: Arc<StatusTables>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mapper = StatusMapper::new(tables);
        let detector = AnomalyDetector::new(mapper.clone(), &config);
        Ok(Self {
            inner: Arc::new(EngineInner {
                ports,
                config,
                mapper,
                detector,
            }),
        })
    }

    /// Engine over the built-in vocabulary tables.
    pub fn with_builtin_tables(ports: EnginePorts, config: EngineConfig) -> Result<Self, ConfigError> {
        Self::new(ports, config, Arc::new(StatusTables::builtin()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn mapper(&self) -> &StatusMapper {
        &self.inner.mapper
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.inner.detector
    }

    pub(crate) fn ports(&self) -> &EnginePorts {
        &self.inner.ports
    }

    pub(crate) fn metrics(&self) -> &dyn MetricsSink {
        self.inner.ports.metrics.as_ref()
    }

    /// Run a side effect whose failure must not change the verdict of the
    /// surrounding operation. Skipped once the token is cancelled.
    pub(crate) async fn best_effort<F>(
        &self,
        effect: &'static str,
        subject: &str,
        token: &CancellationToken,
        fut: F,
    ) -> bool
    where
        F: Future<Output = Result<(), PortError>>,
    {
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(effect, subject, "side effect skipped after cancellation");
                return false;
            }
            outcome = fut => outcome,
        };
        match outcome {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(effect, subject, error = %e, "best-effort side effect failed");
                self.metrics().inc_counter(
                    telemetry::SIDE_EFFECT_FAILURES_TOTAL,
                    &[("effect", effect.to_string())],
                );
                false
            }
        }
    }
}

/// Await a critical-path port call unless the token fires first.
pub(crate) async fn guarded<T, F>(
    token: &CancellationToken,
    operation: &'static str,
    fut: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, PortError>>,
{
    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(EngineError::Cancelled),
        result = fut => result.map_err(|e| EngineError::internal(operation, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn guarded_wraps_port_errors() {
        let token = CancellationToken::new();
        let err = guarded::<(), _>(&token, "fetch_remote_status", async {
            Err(PortError::Unavailable("office offline".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::internal("fetch_remote_status", PortError::Unavailable("office offline".into()))
        );
    }

    #[tokio::test]
    async fn guarded_refuses_to_start_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let err = guarded(&token, "get_local_status", async { Ok::<_, PortError>(1) })
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }

    #[tokio::test]
    async fn guarded_returns_promptly_on_cancel() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = guarded(&token, "fetch_remote_status", async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, PortError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }
}
