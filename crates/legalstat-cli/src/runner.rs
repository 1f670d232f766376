//! Builds the engine from CLI arguments and runs one command.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use legalstat_adapters::{
    HttpRemoteConfig, HttpRemoteStatusSource, InMemoryCache, MetricsFacadeSink,
    TracingEventPublisher,
};
use legalstat_core::{
    CancellationToken, HistoryQuery, PatentId, PortfolioId, RemoteStatusSource, SubscribeRequest,
};
use legalstat_engine::{
    BatchSyncRequest, EngineConfig, EnginePorts, LegalStatusEngine, StatusTables,
};
use serde_json::{json, Value};

use crate::args::{Cli, Command, SubscribeArgs};
use crate::fixture::Fixture;

/// Exit code when a batch had failed items or a reconciliation could not be applied.
pub const EXIT_PARTIAL: u8 = 2;

/// What a command printed and how the process should exit.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub output: Value,
    pub exit_code: u8,
}

impl Outcome {
    fn ok(output: Value) -> Self {
        Self {
            output,
            exit_code: 0,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_yaml_str(&text).with_context(|| format!("loading config {}", path.display()))
}

/// Built-in tables, overlaid with the entries in `path` if given.
pub fn load_tables(path: Option<&Path>) -> Result<StatusTables> {
    let mut tables = StatusTables::builtin();
    if let Some(path) = path {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading status tables {}", path.display()))?;
        let overlay = StatusTables::from_yaml_str(&text)
            .with_context(|| format!("loading status tables {}", path.display()))?;
        tables.merge(overlay);
    }
    Ok(tables)
}

fn http_source(base_url: &str, token: Option<&str>) -> Result<HttpRemoteStatusSource> {
    let mut config = HttpRemoteConfig::new(base_url);
    if let Some(token) = token {
        config = config.with_token(token);
    }
    HttpRemoteStatusSource::new(config).context("building status gateway client")
}

/// Run the command in `cli`. With `--write-back`, the fixture is saved even
/// when the command fails, so failure counters persist.
pub async fn run(cli: &Cli, token: &CancellationToken) -> Result<Outcome> {
    let config = load_config(cli.config.as_deref())?;
    let tables = load_tables(cli.status_tables.as_deref())?;

    let mut fixture = match &cli.fixture {
        Some(path) => Fixture::load(path)?,
        None => Fixture::default(),
    };
    let state = fixture.clone().into_state().await?;

    let remote: Arc<dyn RemoteStatusSource> = match &cli.remote_url {
        Some(url) => Arc::new(http_source(url, cli.remote_token.as_deref())?),
        None => state.remote.clone(),
    };
    tracing::debug!(source = remote.source_name(), "remote status source selected");

    let ports = EnginePorts {
        repository: state.repository.clone(),
        portfolios: state.portfolios.clone(),
        remote,
        cache: Arc::new(InMemoryCache::new()),
        publisher: Arc::new(TracingEventPublisher),
        metrics: Arc::new(MetricsFacadeSink),
    };
    let engine = LegalStatusEngine::new(ports, config, Arc::new(tables))?;

    let result = dispatch(&engine, &cli.command, token).await;

    if cli.write_back {
        if let Some(path) = &cli.fixture {
            fixture.absorb(&state);
            fixture.save(path)?;
            tracing::info!(path = %path.display(), "fixture written back");
        }
    }

    result
}

async fn dispatch(
    engine: &LegalStatusEngine,
    command: &Command,
    token: &CancellationToken,
) -> Result<Outcome> {
    let outcome = match command {
        Command::Sync { patent_id } => {
            Outcome::ok(serde_json::to_value(engine.sync_status(patent_id, token).await?)?)
        }
        Command::Batch(args) => {
            let mut request = BatchSyncRequest::new(&args.patent_ids);
            if !args.jurisdictions.is_empty() {
                request.jurisdictions = Some(args.jurisdictions.clone());
            }
            request.force = args.force;
            let result = engine.batch_sync(&request, token).await?;
            let exit_code = if result.failed > 0 { EXIT_PARTIAL } else { 0 };
            Outcome {
                output: serde_json::to_value(&result)?,
                exit_code,
            }
        }
        Command::Anomalies { portfolio_id } => Outcome::ok(serde_json::to_value(
            engine.detect_anomalies(portfolio_id, token).await?,
        )?),
        Command::Summary { portfolio_id } => Outcome::ok(serde_json::to_value(
            engine.get_status_summary(portfolio_id, token).await?,
        )?),
        Command::Reconcile { patent_id } => {
            let result = engine.reconcile_status(patent_id, token).await?;
            let exit_code = if result.fix_error.is_some() {
                EXIT_PARTIAL
            } else {
                0
            };
            Outcome {
                output: serde_json::to_value(&result)?,
                exit_code,
            }
        }
        Command::History(args) => {
            let query = HistoryQuery {
                page: args.page,
                page_size: args.page_size,
                from: args.from,
                to: args.to,
            };
            Outcome::ok(serde_json::to_value(
                engine.get_status_history(&args.patent_id, &query, token).await?,
            )?)
        }
        Command::Current { patent_id } => Outcome::ok(serde_json::to_value(
            engine.get_current_status(patent_id, token).await?,
        )?),
        Command::Subscribe(args) => {
            let subscription = engine.subscribe(subscribe_request(args)?, token).await?;
            Outcome::ok(serde_json::to_value(subscription)?)
        }
        Command::Unsubscribe { subscription_id } => {
            engine.unsubscribe(subscription_id, token).await?;
            Outcome::ok(json!({ "subscription_id": subscription_id, "active": false }))
        }
        Command::Map {
            jurisdiction,
            raw_status,
        } => {
            let mapped = engine.mapper().map(jurisdiction, raw_status);
            Outcome::ok(json!({
                "jurisdiction": jurisdiction.trim().to_ascii_uppercase(),
                "raw_status": raw_status,
                "code": mapped.code,
                "exact_match": mapped.exact_match,
                "terminal": mapped.code.is_terminal(),
            }))
        }
    };
    Ok(outcome)
}

fn subscribe_request(args: &SubscribeArgs) -> Result<SubscribeRequest> {
    let patent_ids = args
        .patent_ids
        .iter()
        .map(PatentId::new)
        .collect::<Result<Vec<_>, _>>()?;
    let portfolio_id = args.portfolio_id.as_deref().map(PortfolioId::new).transpose()?;
    Ok(SubscribeRequest {
        patent_ids,
        portfolio_id,
        status_filters: args.status_filters.clone(),
        channels: args.channels.clone(),
        recipient: args.recipient.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_without_path() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn config_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        fs::write(&path, "max_batch_concurrency: 0\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("max_batch_concurrency"));
    }

    #[test]
    fn table_overlay_extends_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.yaml");
        fs::write(&path, "TW:\n  \"公告\": GRANTED\n").unwrap();
        let tables = load_tables(Some(&path)).unwrap();
        assert!(tables.lookup("TW", "公告").is_some());
        assert!(tables.lookup("US", "PATENTED CASE").is_some());
    }

    #[test]
    fn subscribe_request_validates_ids() {
        let args = SubscribeArgs {
            patent_ids: vec!["  ".into()],
            portfolio_id: None,
            status_filters: vec![],
            channels: vec![],
            recipient: "x".into(),
        };
        assert!(subscribe_request(&args).is_err());
    }
}
