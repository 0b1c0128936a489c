//! Publish/subscribe registry used for change notifications.
//!
//! Subscribers are closures keyed by an opaque [`CallbackId`]. The registry owns
//! them; removing the id drops the closure.

use std::collections::BTreeMap;
use std::fmt;

/// Handle returned by [`Observer::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Registry of callbacks invoked with a `&T` payload.
///
/// `notify` takes `&self`, so an observer shared with render workers can be
/// notified from any thread.
pub struct Observer<T> {
    callbacks: BTreeMap<CallbackId, Callback<T>>,
    next_id: u64,
}

impl<T> Observer<T> {
    pub fn new() -> Self {
        Self {
            callbacks: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Register a callback and return its handle.
    pub fn add<F>(&mut self, callback: F) -> CallbackId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.callbacks.insert(id, Box::new(callback));
        id
    }

    /// Unregister a callback. Returns false if the id was unknown.
    pub fn remove(&mut self, id: CallbackId) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    /// Invoke every callback in registration order.
    pub fn notify(&self, value: &T) {
        for callback in self.callbacks.values() {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T> Default for Observer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
