//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use legalstat_core::{
    JurisdictionCode, NotificationChannel, Timestamp, UnifiedStatusCode, ValidationError,
};

/// Legal-status sync and reconciliation.
///
/// Runs one engine operation against a JSON fixture (local store, office
/// view and portfolios) or, with `--remote-url`, against a live status
/// gateway. Results are printed to stdout as JSON.
#[derive(Parser, Debug)]
#[command(name = "legalstat", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// JSON fixture holding local records, office records and portfolios.
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Write the fixture back after the command.
    #[arg(long, global = true, requires = "fixture")]
    pub write_back: bool,

    /// Engine configuration (YAML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra status-table entries (YAML), merged over the built-in tables.
    #[arg(long, global = true)]
    pub status_tables: Option<PathBuf>,

    /// Base URL of the legal-status gateway. Overrides the fixture's office records.
    #[arg(long, global = true, env = "LEGALSTAT_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Bearer token for the gateway.
    #[arg(long, global = true, env = "LEGALSTAT_REMOTE_TOKEN", hide_env_values = true)]
    pub remote_token: Option<String>,

    /// Print Prometheus metrics to stderr when the command finishes.
    #[arg(long, global = true)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync one patent against its office.
    Sync {
        patent_id: String,
    },

    /// Sync many patents concurrently.
    Batch(BatchArgs),

    /// Scan a portfolio for anomalies.
    Anomalies {
        portfolio_id: String,
    },

    /// Portfolio status summary with health score.
    Summary {
        portfolio_id: String,
    },

    /// Compare one patent field by field with its office record and apply the office view.
    Reconcile {
        patent_id: String,
    },

    /// Map an office status string to its unified code.
    Map {
        /// Jurisdiction code (e.g. CN, US, EP).
        jurisdiction: String,
        /// Status text as the office reports it.
        raw_status: String,
    },

    /// Page through a patent's status history, newest first.
    History(HistoryArgs),

    /// Current status of one patent.
    Current {
        patent_id: String,
    },

    /// Subscribe to status changes.
    Subscribe(SubscribeArgs),

    /// Deactivate a subscription.
    Unsubscribe {
        subscription_id: String,
    },
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Patent IDs to sync.
    #[arg(required = true)]
    pub patent_ids: Vec<String>,

    /// Restrict to these jurisdictions (logged only).
    #[arg(long = "jurisdiction", value_parser = parse_jurisdiction)]
    pub jurisdictions: Vec<JurisdictionCode>,

    /// Sync even if recently synced (logged only).
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub patent_id: String,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 20)]
    pub page_size: u32,

    /// Earliest event date (RFC 3339).
    #[arg(long, value_parser = parse_timestamp)]
    pub from: Option<Timestamp>,

    /// Latest event date (RFC 3339).
    #[arg(long, value_parser = parse_timestamp)]
    pub to: Option<Timestamp>,
}

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    #[arg(long = "patent")]
    pub patent_ids: Vec<String>,

    #[arg(long = "portfolio")]
    pub portfolio_id: Option<String>,

    /// Unified codes to notify on. Empty means every change.
    #[arg(long = "status")]
    pub status_filters: Vec<UnifiedStatusCode>,

    #[arg(long = "channel", value_parser = parse_channel)]
    pub channels: Vec<NotificationChannel>,

    #[arg(long)]
    pub recipient: String,
}

fn parse_jurisdiction(s: &str) -> Result<JurisdictionCode, ValidationError> {
    JurisdictionCode::new(s)
}

fn parse_timestamp(s: &str) -> Result<Timestamp, ValidationError> {
    Timestamp::parse(s)
}

fn parse_channel(s: &str) -> Result<NotificationChannel, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown channel {s:?} (expected email, webhook, sms or in_app)"))
}
