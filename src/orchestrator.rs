use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::events::{EventSink, FetchEvent, TracingSink};
use crate::key::CacheKey;
use crate::options::{FetchConfig, FetchOptions};
use crate::registry::{CacheRegistry, RefreshTicket};
use crate::subscription::Subscription;
use crate::utils::elapsed_ms;

/// Stale-while-revalidate front end over a [`CacheRegistry`].
///
/// Given a key and a producer, `fetch` decides whether to serve the stored
/// value, wait for the producer, or serve the stored value while refreshing
/// it in the background. Results are published through the registry, so every
/// subscriber of the key sees them without calling the producer itself.
///
/// Cloning is cheap; clones share the registry and the event sink.
pub struct FetchOrchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    registry: Arc<CacheRegistry<T>>,
    config: FetchConfig,
    sink: Arc<dyn EventSink>,
}

impl<T> Clone for FetchOrchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        FetchOrchestrator {
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T> FetchOrchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an orchestrator over `registry` with the default configuration.
    pub fn new(registry: Arc<CacheRegistry<T>>) -> Self {
        Self::with_parts(registry, FetchConfig::default(), Arc::new(TracingSink))
    }

    pub(crate) fn with_parts(
        registry: Arc<CacheRegistry<T>>,
        config: FetchConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        FetchOrchestrator {
            registry,
            config,
            sink,
        }
    }

    pub fn registry(&self) -> &Arc<CacheRegistry<T>> {
        &self.registry
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Stale-while-revalidate: return the stored value or load it.
    ///
    /// - Stored value and `enable_cache`: return it without waiting on the
    ///   producer; with `enable_background_fetch`, also start a background
    ///   refresh unless one is already running for the key.
    /// - Otherwise: await the producer. On success the value is stored (when
    ///   `enable_cache`) and returned, and a background refresh is started when
    ///   `enable_background_fetch` and [`FetchConfig::refresh_after_miss`] are
    ///   both set. On failure the producer's error is returned as is and the
    ///   registry is left untouched.
    ///
    /// Background refreshes run on detached tokio tasks, so this must be called
    /// from within a tokio runtime.
    ///
    /// # Example
    /// ```ignore
    /// let users = orchestrator
    ///     .fetch(CacheKey::from_request("GET", "/users"), || api.list_users(), FetchOptions::default())
    ///     .await?;
    /// ```
    pub async fn fetch<F, Fut, E>(
        &self,
        key: impl Into<CacheKey>,
        producer: F,
        options: FetchOptions,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let key = key.into();
        let producer = Arc::new(producer);

        if options.enable_cache
            && let Some(value) = self.registry.get(key.as_str())
        {
            self.sink.emit(FetchEvent::Hit {
                key: key.to_string(),
            });
            if options.enable_background_fetch {
                self.schedule_refresh(key, producer);
            }
            return Ok(value);
        }

        let start = Instant::now();
        match producer().await {
            Ok(value) => {
                if options.enable_cache {
                    self.registry.publish(key.clone(), value.clone());
                }
                self.sink.emit(FetchEvent::Miss {
                    key: key.to_string(),
                    cached: options.enable_cache,
                    latency_ms: elapsed_ms(start),
                });
                if options.enable_background_fetch && self.config.refresh_after_miss {
                    self.schedule_refresh(key, producer);
                }
                Ok(value)
            }
            Err(err) => {
                self.sink.emit(FetchEvent::ForegroundFailed {
                    key: key.to_string(),
                    latency_ms: elapsed_ms(start),
                });
                Err(err)
            }
        }
    }

    /// Start a background refresh of `key` regardless of what is stored.
    ///
    /// Returns false when a refresh for the key is already running.
    pub fn refresh<F, Fut, E>(&self, key: impl Into<CacheKey>, producer: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.schedule_refresh(key.into(), Arc::new(producer))
    }

    /// Claim the key and spawn the refresh task.
    ///
    /// The claim is taken before spawning, so `is_fetching` is already true
    /// when the caller regains control.
    fn schedule_refresh<F, Fut, E>(&self, key: CacheKey, producer: Arc<F>) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let Some(ticket) = self.registry.try_begin_refresh(key) else {
            return false;
        };

        self.sink.emit(FetchEvent::RefreshScheduled {
            key: ticket.key().to_string(),
        });

        let registry = Arc::clone(&self.registry);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(run_background_refresh(registry, sink, ticket, producer));
        true
    }

    /// Open a subscription on `key`. See [`CacheRegistry::subscribe`].
    pub fn subscribe(&self, key: impl Into<CacheKey>) -> Subscription<T> {
        self.registry.subscribe(key)
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.registry.get(key)
    }

    pub fn is_fetching(&self, key: &str) -> bool {
        self.registry.is_fetching(key)
    }

    /// Drop the entry so the next `fetch` goes to the producer.
    pub fn clear(&self, key: &str) {
        self.registry.clear(key)
    }

    pub fn clear_all(&self) {
        self.registry.clear_all()
    }

    /// Flush the event sink.
    pub async fn flush_events(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sink.flush().await
    }
}

/// Body of a background refresh task.
///
/// Awaits the producer once. A success is stored through the ticket, which
/// clears the fetching flag and notifies subscribers. A failure clears the
/// fetching flag, keeps the previous value and is reported only to the event
/// sink: background errors never reach a caller or subscriber.
///
/// If the key was cleared while the producer ran, the result is dropped and
/// the key stays absent.
pub async fn run_background_refresh<T, F, Fut, E>(
    registry: Arc<CacheRegistry<T>>,
    sink: Arc<dyn EventSink>,
    ticket: RefreshTicket,
    producer: Arc<F>,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let start = Instant::now();
    let result = producer().await;
    let latency_ms = elapsed_ms(start);
    let key = ticket.key().to_string();

    match result {
        Ok(value) => {
            if registry.complete_refresh(&ticket, value) {
                sink.emit(FetchEvent::RefreshSucceeded { key, latency_ms });
            } else {
                tracing::debug!("Dropping refresh result for cleared key: key={}", key);
            }
        }
        Err(err) => {
            registry.finish_refresh(&ticket);
            sink.emit(FetchEvent::RefreshFailed {
                key,
                latency_ms,
                error: err.to_string(),
            });
        }
    }
}
