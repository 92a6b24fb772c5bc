//! swr-fetch - Stale-while-revalidate request caching for Rust
//!
//! This library provides:
//! - A keyed registry of last known results with per-key broadcast updates
//! - Stale-while-revalidate fetching with background refresh
//! - At most one background refresh per key at a time
//! - Failure isolation: a failed refresh never loses the last good value
//!
//! # Example
//!
//! ```ignore
//! use swr_fetch::{CacheKey, CacheRegistry, FetchOptions, FetchOrchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ApiError> {
//!     let registry = Arc::new(CacheRegistry::new());
//!     let orchestrator = FetchOrchestrator::new(registry);
//!
//!     let key = CacheKey::from_request("GET", "/users");
//!
//!     // Watch the key from anywhere; updates arrive without re-fetching
//!     let mut users = orchestrator.subscribe(key.clone());
//!
//!     // First call waits for the producer, later calls return the stored
//!     // value at once and refresh it in the background
//!     let list = orchestrator
//!         .fetch(key, || async { api::list_users().await }, FetchOptions::default())
//!         .await?;
//!
//!     let refreshed = users.changed().await;
//!     Ok(())
//! }
//! ```

mod builder;
mod entry;
mod error;
mod events;
mod key;
mod options;
mod orchestrator;
mod registry;
mod subscription;
mod utils;

// Re-export public API
pub use builder::OrchestratorBuilder;
pub use error::CacheError;
pub use events::{EventSink, FetchEvent, TracingSink};
pub use key::CacheKey;
pub use options::{FetchConfig, FetchOptions, REFRESH_AFTER_MISS_ENV};
pub use orchestrator::{FetchOrchestrator, run_background_refresh};
pub use registry::{CacheRegistry, RefreshTicket};
pub use subscription::Subscription;
