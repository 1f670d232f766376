//! `legalstat` entry point.

use std::process::ExitCode;

use clap::Parser;
use legalstat_cli::Cli;
use legalstat_core::CancellationToken;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let metrics = if cli.print_metrics {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "could not install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let code = runtime.block_on(async {
        let token = CancellationToken::new();
        let on_signal = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                on_signal.cancel();
            }
        });

        match legalstat_cli::run(&cli, &token).await {
            Ok(outcome) => match serde_json::to_string_pretty(&outcome.output) {
                Ok(text) => {
                    println!("{text}");
                    outcome.exit_code
                }
                Err(e) => {
                    tracing::error!("failed to render output: {e}");
                    1
                }
            },
            Err(e) => {
                tracing::error!("{e:#}");
                1
            }
        }
    });

    print_metrics(metrics.as_ref());
    ExitCode::from(code)
}

fn print_metrics(handle: Option<&PrometheusHandle>) {
    if let Some(handle) = handle {
        eprintln!("{}", handle.render());
    }
}
