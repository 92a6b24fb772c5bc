use futures::{Stream, StreamExt, stream};
use tokio::sync::watch;

use crate::error::CacheError;
use crate::key::CacheKey;

/// A live view of one cache key.
///
/// All subscriptions for a key share the same broadcast slot, so every observer
/// sees the same values regardless of which call triggered the store. The slot
/// only keeps the latest value: an observer that falls behind skips straight to
/// the newest one.
#[derive(Debug, Clone)]
pub struct Subscription<T> {
    key: CacheKey,
    receiver: watch::Receiver<Option<T>>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(key: CacheKey, receiver: watch::Receiver<Option<T>>) -> Self {
        Subscription { key, receiver }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Return the latest value and mark it as seen.
    pub fn current(&mut self) -> Option<T> {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether the key has been cleared since this subscription was opened.
    pub fn is_closed(&self) -> bool {
        self.receiver.has_changed().is_err()
    }

    /// Wait for the next store on this key and return the stored value.
    ///
    /// Returns `CacheError::Cleared` once the entry has been removed from the
    /// registry; the subscription is dead from then on and a new one has to be
    /// opened to follow the key again.
    pub async fn changed(&mut self) -> Result<Option<T>, CacheError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| CacheError::cleared(self.key.as_str()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Turn the subscription into a stream.
    ///
    /// The stream yields the current value first, then one item per observed
    /// update, and ends when the key is cleared.
    pub fn into_stream(mut self) -> impl Stream<Item = Option<T>> + Send + 'static {
        let first = self.current();
        let updates = stream::unfold(self, |mut sub| async move {
            match sub.changed().await {
                Ok(value) => Some((value, sub)),
                Err(_) => None,
            }
        });
        stream::once(async move { first }).chain(updates)
    }
}
