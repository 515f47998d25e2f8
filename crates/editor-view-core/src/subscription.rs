//! Change-notification callback lists.
//!
//! Documents, folding, configuration and views all notify observers in the same way: a list
//! of boxed `FnMut` callbacks, invoked synchronously in subscription order. Subscribers get a
//! [`SubscriptionId`] back so they can detach again; detaching while a notification is being
//! delivered is not supported (the list is borrowed mutably during delivery).

use std::fmt;

/// Handle returned by `subscribe`; pass it to `unsubscribe` to detach the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value (unique per subscriber list).
    pub fn get(self) -> u64 {
        self.0
    }
}

type Callback<E> = Box<dyn FnMut(&E)>;

/// Ordered list of callbacks receiving `&E`.
pub struct Subscribers<E> {
    callbacks: Vec<(SubscriptionId, Callback<E>)>,
    next_id: u64,
}

impl<E> Subscribers<E> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a callback.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Detach a callback. Returns `false` if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(cid, _)| *cid != id);
        self.callbacks.len() != before
    }

    /// Deliver `event` to every callback.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    /// Number of attached callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// `true` if no callback is attached.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.callbacks.len())
            .finish()
    }
}
