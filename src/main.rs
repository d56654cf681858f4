//! Tracked Cache daemon
//!
//! Opens the cache, keeps the auto-dump loop running and writes a final dump
//! on shutdown.

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracked_cache::{CacheService, Config};

/// Main entry point for the cache daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache (restoring the last dump if enabled)
/// 4. Start the auto-dump task
/// 5. Wait for SIGINT/SIGTERM, then stop auto-dump and write a final dump
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracked_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tracked Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={:?}, max_size={}, auto_dump_interval={}s, dump_file={}",
        config.backend,
        config.max_size,
        config.auto_dump_interval,
        config.dump_file.display()
    );

    let service = CacheService::open(&config).context("failed to open cache")?;
    info!(keys = service.size(), "Cache ready");

    if !service.start_auto_dump() {
        warn!("Auto-dump is disabled, only the shutdown dump will be written");
    }

    shutdown_signal().await?;

    service.shutdown().await.context("final dump failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
