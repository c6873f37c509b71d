//! weathergate - Caching proxy for weather observations and forecasts
//!
//! Serves the provider's daily station observations and hourly forecasts over
//! HTTP, keeping recent responses in memory so the provider is called at most
//! once per freshness window.

use std::process;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use weathergate::cache::CacheManager;
use weathergate::cli::{Cli, Settings};
use weathergate::data::UpstreamClient;
use weathergate::server::{self, AppState};
use weathergate::telemetry;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    if let Err(err) = telemetry::init(&settings.logging) {
        eprintln!("error: {err}");
        process::exit(1);
    }

    if let Err(err) = run(settings).await {
        error!(error = %err, "weathergate exited with an error");
        process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    if settings.upstream.api_token.is_none() {
        info!("WEATHER_API_TOKEN not set; forecast requests will fail until it is configured");
    }

    let upstream = UpstreamClient::new(settings.upstream.clone())?;
    let cache = CacheManager::new(settings.cache_max_age);
    let app = server::router(AppState::new(cache, upstream));

    let listener = TcpListener::bind(settings.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        cache_max_age_s = settings.cache_max_age.as_secs(),
        upstream_timeout_s = settings.upstream.timeout.as_secs(),
        "weathergate listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("weathergate stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
