//! Fetch events for monitoring the orchestrator.
//!
//! The orchestrator reports what it did on every call (hit, miss, background
//! refresh outcome) to an [`EventSink`]. The default [`TracingSink`] turns the
//! events into `tracing` debug records; plug in your own sink to feed a
//! metrics backend.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use swr_fetch::{EventSink, FetchEvent, OrchestratorBuilder};
//!
//! let sink = Arc::new(MyCounterSink::new());
//! let orchestrator = OrchestratorBuilder::<String>::new().sink(sink).build();
//! ```

use async_trait::async_trait;

/// Events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// A stored value was served without waiting on the producer.
    Hit {
        /// The cache key.
        key: String,
    },
    /// The producer was awaited in the foreground and succeeded.
    Miss {
        /// The cache key.
        key: String,
        /// Whether the result was written to the registry.
        cached: bool,
        /// Producer latency in milliseconds.
        latency_ms: f64,
    },
    /// The producer was awaited in the foreground and failed.
    ForegroundFailed {
        /// The cache key.
        key: String,
        /// Producer latency in milliseconds.
        latency_ms: f64,
    },
    /// A background refresh task was spawned.
    RefreshScheduled {
        /// The cache key.
        key: String,
    },
    /// A background refresh stored a new value.
    RefreshSucceeded {
        /// The cache key.
        key: String,
        /// Producer latency in milliseconds.
        latency_ms: f64,
    },
    /// A background refresh failed; the previous value was kept.
    RefreshFailed {
        /// The cache key.
        key: String,
        /// Producer latency in milliseconds.
        latency_ms: f64,
        /// Rendered producer error.
        error: String,
    },
}

impl FetchEvent {
    /// The key the event refers to.
    pub fn key(&self) -> &str {
        match self {
            FetchEvent::Hit { key }
            | FetchEvent::Miss { key, .. }
            | FetchEvent::ForegroundFailed { key, .. }
            | FetchEvent::RefreshScheduled { key }
            | FetchEvent::RefreshSucceeded { key, .. }
            | FetchEvent::RefreshFailed { key, .. } => key,
        }
    }

    /// Short, stable event name for labels.
    pub fn name(&self) -> &'static str {
        match self {
            FetchEvent::Hit { .. } => "hit",
            FetchEvent::Miss { .. } => "miss",
            FetchEvent::ForegroundFailed { .. } => "foreground_failed",
            FetchEvent::RefreshScheduled { .. } => "refresh_scheduled",
            FetchEvent::RefreshSucceeded { .. } => "refresh_succeeded",
            FetchEvent::RefreshFailed { .. } => "refresh_failed",
        }
    }
}

/// Trait for receiving fetch events.
///
/// # Example
///
/// ```ignore
/// use std::sync::Mutex;
/// use async_trait::async_trait;
/// use swr_fetch::{EventSink, FetchEvent};
///
/// struct BufferedSink {
///     buffer: Mutex<Vec<FetchEvent>>,
/// }
///
/// #[async_trait]
/// impl EventSink for BufferedSink {
///     fn emit(&self, event: FetchEvent) {
///         self.buffer.lock().unwrap().push(event);
///     }
///
///     async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit a single event.
    ///
    /// Called synchronously on the fetch path and from refresh tasks, so keep
    /// it cheap.
    fn emit(&self, event: FetchEvent);

    /// Flush any buffered events.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Sink that writes every event to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    fn emit(&self, event: FetchEvent) {
        match &event {
            FetchEvent::RefreshFailed {
                key,
                latency_ms,
                error,
            } => {
                tracing::debug!(
                    "Background refresh failed, keeping previous value: key={}, latency_ms={:.3}, error={}",
                    key,
                    latency_ms,
                    error
                );
            }
            other => {
                tracing::debug!("Fetch event: event={}, key={}", other.name(), other.key());
            }
        }
    }
}
