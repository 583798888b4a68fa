//! Travel Cache - A two-tier client-side cache
//!
//! Runs a file-backed cache instance: warms a few reference-data keys,
//! keeps the TTL sweeper running and reports statistics until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use travel_cache::cache::keys;
use travel_cache::{spawn_cleanup_task, CacheConfig, CacheService, FileStore, Ttl};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Airport {
    iata: String,
    city: String,
}

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the persistent store and create the cache
/// 4. Start background TTL cleanup task
/// 5. Warm reference data through get_or_set
/// 6. Wait for SIGINT/SIGTERM, then shut down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travel_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Travel Cache");

    let config = CacheConfig::from_env();
    let cache_file = std::env::var("CACHE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("travel_cache.json"));
    info!(
        "Configuration loaded: max_memory_items={}, default_ttl={:?}, persist={}, file={}",
        config.max_memory_items,
        config.default_ttl,
        config.persist_to_storage,
        cache_file.display()
    );

    let store = FileStore::open(&cache_file)
        .await
        .with_context(|| format!("opening cache file {}", cache_file.display()))?;
    let cleanup_interval = config.cleanup_interval;
    let cache = Arc::new(
        CacheService::new(config, Arc::new(store)).context("invalid cache configuration")?,
    );
    info!("Cache initialized");

    let cleanup_handle = spawn_cleanup_task(cache.clone(), cleanup_interval);

    let airports = cache
        .get_or_set(keys::AIRPORTS, load_airports, Some(Ttl::VERY_LONG))
        .await?;
    info!("Warm airports: {} entries", airports.len());

    let stats = cache.stats();
    info!(
        "Cache stats: items={}, size={}B, hits={}, misses={}, promotions={}",
        stats.memory_items, stats.memory_size, stats.hits, stats.misses, stats.promotions
    );

    shutdown_signal().await;

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
    info!("Shutdown complete");
    Ok(())
}

/// Stand-in loader for reference data normally fetched from the backend.
async fn load_airports() -> anyhow::Result<Vec<Airport>> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(vec![
        Airport {
            iata: "LHR".to_string(),
            city: "London".to_string(),
        },
        Airport {
            iata: "CDG".to_string(),
            city: "Paris".to_string(),
        },
        Airport {
            iata: "JFK".to_string(),
            city: "New York".to_string(),
        },
    ])
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
