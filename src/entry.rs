use tokio::sync::watch;

/// The per-key record kept by the registry.
///
/// The last known value lives inside the broadcast slot itself, so the value
/// returned by `data()` and the value seen by subscribers can never disagree.
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// Registry-unique identity; a key that is cleared and recreated gets a
    /// new id.
    id: u64,

    /// Broadcast slot holding the latest value. Dropping it closes every
    /// subscription for the key.
    sender: watch::Sender<Option<T>>,

    /// True while a background refresh for this key is outstanding.
    is_fetching: bool,
}

impl<T> CacheEntry<T> {
    /// Create an entry with a fresh broadcast slot initialised to `data`.
    pub fn new(id: u64, data: Option<T>, is_fetching: bool) -> Self {
        let (sender, _) = watch::channel(data);
        CacheEntry {
            id,
            sender,
            is_fetching,
        }
    }

    /// Replace the value and fetching flag, notifying current subscribers.
    ///
    /// `send_replace` stores the value even when nobody is subscribed, which
    /// keeps later subscribers and `data()` consistent.
    pub fn replace(&mut self, data: Option<T>, is_fetching: bool) {
        self.is_fetching = is_fetching;
        self.sender.send_replace(data);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    pub fn set_fetching(&mut self, is_fetching: bool) {
        self.is_fetching = is_fetching;
    }

    /// Open a new receiver on the broadcast slot.
    pub fn receiver(&self) -> watch::Receiver<Option<T>> {
        self.sender.subscribe()
    }

    pub fn has_data(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> CacheEntry<T> {
    /// Return a clone of the last known value.
    pub fn data(&self) -> Option<T> {
        self.sender.borrow().clone()
    }
}
