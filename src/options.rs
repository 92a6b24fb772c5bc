use serde::{Deserialize, Serialize};
use std::env;

use crate::utils::parse_flag;

/// Environment variable read by [`FetchConfig::from_env`].
pub const REFRESH_AFTER_MISS_ENV: &str = "SWR_REFRESH_AFTER_MISS";

/// Per-call switches for [`FetchOrchestrator::fetch`](crate::FetchOrchestrator::fetch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Serve stored values and store fetched ones.
    ///
    /// When false the producer is awaited on every call and nothing is
    /// written to the registry.
    pub enable_cache: bool,

    /// Refresh the key in the background after serving it.
    pub enable_background_fetch: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            enable_cache: true,
            enable_background_fetch: true,
        }
    }
}

impl FetchOptions {
    /// Caching and background refresh both enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always call the producer; never read or write the registry.
    pub fn no_cache() -> Self {
        FetchOptions {
            enable_cache: false,
            enable_background_fetch: false,
        }
    }

    /// Serve from cache when possible but never refresh in the background.
    pub fn cache_only() -> Self {
        FetchOptions {
            enable_cache: true,
            enable_background_fetch: false,
        }
    }

    pub fn with_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    pub fn with_background_fetch(mut self, enable: bool) -> Self {
        self.enable_background_fetch = enable;
        self
    }
}

/// Orchestrator-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Schedule a background refresh right after a successful foreground
    /// fetch on a miss (when the call enables background fetching).
    ///
    /// The data was fetched a moment ago, so this refresh is usually
    /// redundant; it is kept on by default to match the established
    /// behaviour. Turn it off to refresh only on cache hits.
    ///
    /// Default: `true`
    pub refresh_after_miss: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            refresh_after_miss: true,
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(REFRESH_AFTER_MISS_ENV) {
            match parse_flag(&raw) {
                Some(flag) => config.refresh_after_miss = flag,
                None => tracing::warn!(
                    "Ignoring invalid {} value: {:?}",
                    REFRESH_AFTER_MISS_ENV,
                    raw
                ),
            }
        }
        config
    }

    pub fn with_refresh_after_miss(mut self, enable: bool) -> Self {
        self.refresh_after_miss = enable;
        self
    }
}
