//! This file defines the travel-insights binary entry point.

use travel_insights::app;
use travel_insights::cli;
use travel_insights::metrics;
use travel_insights::server;
use travel_insights::tracing;

use std::process::ExitCode;

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    tracing::init_tracing();
    ::tracing::debug!(?args, "parsed arguments");
    if let Err(error) = metrics::register_metrics() {
        ::tracing::error!(%error, "failed to register metrics");
        return ExitCode::FAILURE;
    }
    let service = app::service(&args);
    match server::serve(&args, service).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            ::tracing::error!(%error, "server error");
            ExitCode::FAILURE
        }
    }
}
