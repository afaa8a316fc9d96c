//! Listen subscriptions
//!
//! A listener is keyed by (remote endpoint, address, arguments). Starting
//! a key that is already present does nothing; stopping a present key
//! runs its cancellation exactly once.

use fastosc_core::ArgValue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Identity of one subscription request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub remote: SocketAddr,
    pub address: String,
    pub args: Vec<ArgValue>,
}

impl ListenerKey {
    pub fn new(remote: SocketAddr, address: impl Into<String>, args: Vec<ArgValue>) -> Self {
        Self {
            remote,
            address: address.into(),
            args,
        }
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|", self.remote, self.address)?;
        write!(f, "{}", ArgValue::Array(self.args.clone()))
    }
}

/// Tears down one subscription. Consumed on use, so it runs at most once.
pub struct CancelHandle(Box<dyn FnOnce() + Send>);

impl CancelHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(cancel))
    }

    pub fn cancel(self) {
        (self.0)()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CancelHandle")
    }
}

/// Invoked by a provider whenever a watched value changes
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Watches values on behalf of listen routes
pub trait SubscriptionProvider: Send + Sync {
    /// Start watching the value behind `address` (the route's declared
    /// address, without namespace or kind prefix) for these arguments.
    ///
    /// Returns `None` when the target cannot be watched.
    fn subscribe(&self, address: &str, args: &[ArgValue], on_change: ChangeCallback) -> Option<CancelHandle>;
}

/// Provider for services with nothing to watch
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSubscriptions;

impl SubscriptionProvider for NoSubscriptions {
    fn subscribe(&self, _address: &str, _args: &[ArgValue], _on_change: ChangeCallback) -> Option<CancelHandle> {
        None
    }
}

/// Active subscriptions
#[derive(Debug, Default)]
pub struct ListenerTable {
    entries: Mutex<HashMap<ListenerKey, CancelHandle>>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &ListenerKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Store a subscription. If the key was filled in the meantime the
    /// existing entry wins and the new handle is handed back.
    pub fn insert(&self, key: ListenerKey, handle: CancelHandle) -> Option<CancelHandle> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return Some(handle);
        }
        entries.insert(key, handle);
        None
    }

    /// Remove and cancel a subscription. Returns whether one existed.
    pub fn stop(&self, key: &ListenerKey) -> bool {
        let handle = self.entries.lock().remove(key);
        match handle {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every subscription; returns how many there were
    pub fn clear(&self) -> usize {
        let drained: Vec<CancelHandle> = self.entries.lock().drain().map(|(_, h)| h).collect();
        let count = drained.len();
        for handle in drained {
            handle.cancel();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<ListenerKey> {
        self.entries.lock().keys().cloned().collect()
    }
}
