//! Builder API for creating fetch orchestrators.
//!
//! `FetchOrchestrator::new(registry)` covers the common case; the builder is
//! for wiring in a shared registry, a configuration loaded from elsewhere, or
//! a custom event sink.

use std::sync::Arc;

use crate::events::{EventSink, TracingSink};
use crate::options::FetchConfig;
use crate::orchestrator::FetchOrchestrator;
use crate::registry::CacheRegistry;

/// Builder for [`FetchOrchestrator`].
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use swr_fetch::{CacheRegistry, FetchConfig, OrchestratorBuilder};
///
/// let registry = Arc::new(CacheRegistry::new());
///
/// let orchestrator = OrchestratorBuilder::new()
///     .registry(registry.clone())
///     .config(FetchConfig::from_env())
///     .build();
///
/// // Another orchestrator over the same registry shares entries and subscribers
/// let other = OrchestratorBuilder::new().registry(registry).build();
/// ```
pub struct OrchestratorBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    registry: Option<Arc<CacheRegistry<T>>>,
    config: FetchConfig,
    sink: Option<Arc<dyn EventSink>>,
}

impl<T> OrchestratorBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new OrchestratorBuilder.
    pub fn new() -> Self {
        OrchestratorBuilder {
            registry: None,
            config: FetchConfig::default(),
            sink: None,
        }
    }

    /// Use an existing registry instead of creating a fresh one.
    pub fn registry(mut self, registry: Arc<CacheRegistry<T>>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for setting [`FetchConfig::refresh_after_miss`].
    pub fn refresh_after_miss(mut self, enable: bool) -> Self {
        self.config.refresh_after_miss = enable;
        self
    }

    /// Send fetch events to `sink` instead of `tracing`.
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> FetchOrchestrator<T> {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CacheRegistry::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        FetchOrchestrator::with_parts(registry, self.config, sink)
    }
}

impl<T> Default for OrchestratorBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
