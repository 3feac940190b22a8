//! Live remote objects.
//!
//! The registry creates one live object per declared name on the side the
//! process plays. Each owns its transport handle and its composed
//! middleware, and runs every call through the shared argument pipeline.

mod broadcast;
mod event;
mod function;
mod pending;
mod pipeline;

pub use broadcast::{BroadcastListener, ServerBroadcast};
pub use event::{ClientEvent, ClientListener, ServerEvent, ServerListener};
pub use function::{
    BoundClientFunction, BoundServerFunction, ClientFunction, ClientFunctionHandler,
    ServerFunction, ServerFunctionHandler,
};

pub(crate) use pipeline::RemoteCore;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Identifies one connected listener so it can be disconnected later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Connected listeners, called in connection order.
pub(crate) struct Listeners<L: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Arc<L>)>>,
}

impl<L: ?Sized> Listeners<L> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, listener: Arc<L>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    /// The current listeners. Called without the lock held, so a listener
    /// may connect or disconnect others.
    pub(crate) fn snapshot(&self) -> Vec<Arc<L>> {
        self.lock().iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Arc<L>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_add_remove() {
        let listeners: Listeners<dyn Fn(u32) + Send + Sync> = Listeners::new();
        let a = listeners.add(Arc::new(|_: u32| {}));
        let b = listeners.add(Arc::new(|_: u32| {}));
        assert_ne!(a, b);
        assert_eq!(listeners.snapshot().len(), 2);
        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        assert_eq!(listeners.snapshot().len(), 1);
        assert!(!listeners.is_empty());
    }
}
