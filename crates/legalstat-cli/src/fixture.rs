//! JSON fixture: the local store, the office view and portfolio membership
//! for a CLI run.
//!
//! ```json
//! {
//!   "records": [ { "patent_id": "US1", "jurisdiction": "US", ... } ],
//!   "remote": { "US1": { "status": "PATENTED CASE", "jurisdiction": "US", ... } },
//!   "portfolios": { "core": ["US1"] },
//!   "history": [],
//!   "subscriptions": []
//! }
//! ```
//!
//! With `--write-back`, records, history and subscriptions are written back
//! after the command so consecutive runs see each other's effects.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use legalstat_adapters::{
    InMemoryPortfolioDirectory, InMemoryStatusRepository, MockRemoteStatusSource,
};
use legalstat_core::{
    LocalStatusRecord, RemoteStatusRecord, StatusHistoryEvent, StatusRepository, Subscription,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub records: Vec<LocalStatusRecord>,
    pub remote: BTreeMap<String, RemoteStatusRecord>,
    pub portfolios: BTreeMap<String, Vec<String>>,
    pub history: Vec<StatusHistoryEvent>,
    pub subscriptions: Vec<Subscription>,
}

/// In-memory ports populated from a fixture.
#[derive(Debug, Clone)]
pub struct FixtureState {
    pub repository: Arc<InMemoryStatusRepository>,
    pub portfolios: Arc<InMemoryPortfolioDirectory>,
    pub remote: Arc<MockRemoteStatusSource>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("writing fixture {}", path.display()))
    }

    /// Build the in-memory adapters.
    pub async fn into_state(self) -> Result<FixtureState> {
        let repository = Arc::new(InMemoryStatusRepository::new());
        for record in self.records {
            repository.insert(record);
        }
        for event in &self.history {
            repository.append_history(event).await?;
        }
        for subscription in &self.subscriptions {
            repository.save_subscription(subscription).await?;
        }

        let portfolios = Arc::new(InMemoryPortfolioDirectory::new());
        for (portfolio, members) in &self.portfolios {
            portfolios
                .assign(portfolio, members)
                .with_context(|| format!("portfolio {portfolio:?}"))?;
        }

        let remote = Arc::new(MockRemoteStatusSource::new());
        for (patent_id, record) in self.remote {
            remote.set(&patent_id, record);
        }

        Ok(FixtureState {
            repository,
            portfolios,
            remote,
        })
    }

    /// Copy the mutable parts of `state` back into this fixture.
    pub fn absorb(&mut self, state: &FixtureState) {
        self.records = state.repository.records();
        self.history = state.repository.all_history();
        self.subscriptions = state.repository.subscriptions();
    }
}
