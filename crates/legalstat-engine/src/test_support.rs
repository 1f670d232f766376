use std::sync::Arc;

use legalstat_adapters::{
    InMemoryCache, InMemoryPortfolioDirectory, InMemoryStatusRepository, MockRemoteStatusSource,
    RecordingMetrics, RecordingPublisher,
};
use legalstat_core::{
    JurisdictionCode, LocalStatusRecord, PatentId, RemoteStatusRecord, Timestamp,
};

use crate::{EngineConfig, EnginePorts, LegalStatusEngine};

pub(crate) struct Fixture {
    pub engine: LegalStatusEngine,
    pub repository: Arc<InMemoryStatusRepository>,
    pub portfolios: Arc<InMemoryPortfolioDirectory>,
    pub remote: Arc<MockRemoteStatusSource>,
    pub cache: Arc<InMemoryCache>,
    pub publisher: Arc<RecordingPublisher>,
    pub metrics: Arc<RecordingMetrics>,
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(EngineConfig::default())
}

pub(crate) fn fixture_with(config: EngineConfig) -> Fixture {
    let repository = Arc::new(InMemoryStatusRepository::new());
    let portfolios = Arc::new(InMemoryPortfolioDirectory::new());
    let remote = Arc::new(MockRemoteStatusSource::new());
    let cache = Arc::new(InMemoryCache::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let metrics = Arc::new(RecordingMetrics::new());
    let ports = EnginePorts {
        repository: repository.clone(),
        portfolios: portfolios.clone(),
        remote: remote.clone(),
        cache: cache.clone(),
        publisher: publisher.clone(),
        metrics: metrics.clone(),
    };
    let engine = LegalStatusEngine::with_builtin_tables(ports, config).unwrap();
    Fixture {
        engine,
        repository,
        portfolios,
        remote,
        cache,
        publisher,
        metrics,
    }
}

fn effective() -> Timestamp {
    Timestamp::parse("2025-01-01T00:00:00Z").unwrap()
}

pub(crate) fn local_record(id: &str, jurisdiction: &str, status: &str) -> LocalStatusRecord {
    LocalStatusRecord {
        patent_id: PatentId::new(id).unwrap(),
        jurisdiction: JurisdictionCode::new(jurisdiction).unwrap(),
        current_status: status.to_string(),
        previous_status: None,
        remote_status: None,
        effective_date: effective(),
        next_action: None,
        next_deadline: None,
        last_sync_at: None,
        consecutive_sync_failures: 0,
        raw_payload: serde_json::Value::Null,
    }
}

pub(crate) fn remote_record(jurisdiction: &str, status: &str) -> RemoteStatusRecord {
    RemoteStatusRecord {
        status: status.to_string(),
        jurisdiction: JurisdictionCode::new(jurisdiction).unwrap(),
        effective_date: effective(),
        next_action: None,
        next_deadline: None,
        source: "mock".to_string(),
        raw_payload: serde_json::Value::Null,
    }
}
