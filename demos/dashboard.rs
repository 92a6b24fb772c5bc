//! Example showing one request shared by a fetching caller and a live observer.
//!
//! A "dashboard" subscribes to `GET /stats` while a request loop fetches it
//! with stale-while-revalidate semantics. The first fetch waits for the fake
//! API; later fetches return the cached value immediately and the observer
//! receives each background refresh without calling the API itself.
//!
//! Run with `RUST_LOG=swr_fetch=debug cargo run --example dashboard` to see the
//! orchestrator's events.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use swr_fetch::{CacheKey, CacheRegistry, FetchConfig, FetchOptions, OrchestratorBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct Stats {
    revision: u64,
    active_users: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(CacheRegistry::<Stats>::new());
    let orchestrator = OrchestratorBuilder::new()
        .registry(registry.clone())
        .config(FetchConfig::from_env())
        .build();

    let key = CacheKey::from_request("GET", "/stats");

    // Fake API: every call bumps the revision
    let revision = Arc::new(AtomicU64::new(0));
    let load_stats = move || {
        let revision = revision.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let revision = revision.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, String>(Stats {
                revision,
                active_users: 100 + revision * 7,
            })
        }
    };

    // Observer: prints whatever lands in the cache for the key
    let mut dashboard = orchestrator.subscribe(key.clone());
    let observer = tokio::spawn(async move {
        while let Ok(update) = dashboard.changed().await {
            if let Some(stats) = update {
                println!(
                    "[dashboard] revision {} -> {} active users",
                    stats.revision, stats.active_users
                );
            }
        }
        println!("[dashboard] key cleared, stopping");
    });

    for round in 1..=3 {
        let stats = orchestrator
            .fetch(key.clone(), load_stats.clone(), FetchOptions::default())
            .await?;
        println!(
            "[request {}] got revision {} (refreshing: {})",
            round,
            stats.revision,
            orchestrator.is_fetching(key.as_str())
        );
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    orchestrator.clear(key.as_str());
    observer.await?;
    Ok(())
}
