//! Hardware Monitor - host metrics over an authenticated HTTP API
//!
//! Collects CPU, memory, disk and network samples on demand and serves
//! them together with health and mission status.

use anyhow::{Context, Result};
use hardware_monitor::{api, config::MonitorConfig};
use monitor_lib::{
    Aggregator, Collectors, HostProbe, LastKnownGoodProbe, StructuredLogger, SysinfoProbe,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON logs to stdout, and to `log_file` when configured
fn init_tracing(config: &MonitorConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("hardware-monitor.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal(logger: StructuredLogger) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    logger.log_shutdown("SIGINT received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first so the log level applies from the first event
    let config = MonitorConfig::load()?;
    let _log_guard = init_tracing(&config);

    info!("Starting hardware-monitor");
    if MonitorConfig::jwt_secret_is_ephemeral() {
        warn!("HWMON_JWT_SECRET is not set; tokens will not survive a restart");
    }

    let probe: Arc<dyn HostProbe> = if config.fallback_to_last_good {
        info!("Serving last known good readings on probe failure");
        Arc::new(LastKnownGoodProbe::new(SysinfoProbe::new()))
    } else {
        Arc::new(SysinfoProbe::new())
    };

    let logger = StructuredLogger::new(SysinfoProbe::host_name());
    let collectors = Collectors::new(probe, config.collector_config());
    let aggregator = Aggregator::new(collectors, config.thresholds(), logger.clone());
    let state = Arc::new(api::AppState::new(aggregator, &config));

    let addr = config.bind_addr();
    logger.log_startup(MONITOR_VERSION, &addr);

    api::serve(&addr, state, shutdown_signal(logger))
        .await
        .with_context(|| format!("API server on {} failed", addr))?;

    info!("Shutting down");
    Ok(())
}
