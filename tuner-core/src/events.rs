//! Typed subscriber registries.
//!
//! Each event kind gets its own [`Subscribers`] list with a concrete callback type,
//! so payloads are checked at compile time and the number of registered callbacks
//! doubles as the interest count the poller consults every tick.

use std::fmt;

/// Handle returned when registering a callback; pass it back to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Callback receiving a buffer, or `None` when the tick was below the gain threshold.
pub type BufferCallback<T> = Box<dyn FnMut(Option<&[T]>) + Send>;

/// An ordered list of callbacks of one type.
pub struct Subscribers<F: ?Sized> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<F>)>,
}

impl<F: ?Sized> Default for Subscribers<F> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Subscribers<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<F: ?Sized> Subscribers<F> {
    pub fn add(&mut self, callback: Box<F>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Unregisters a callback. Returns `false` if the id was not registered here.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calls `invoke` on every callback in registration order.
    pub fn for_each(&mut self, mut invoke: impl FnMut(&mut F)) {
        for (_, callback) in self.entries.iter_mut() {
            invoke(callback.as_mut());
        }
    }
}

impl<T> Subscribers<dyn FnMut(Option<&[T]>) + Send> {
    pub fn emit(&mut self, payload: Option<&[T]>) {
        self.for_each(|callback| callback(payload));
    }
}
