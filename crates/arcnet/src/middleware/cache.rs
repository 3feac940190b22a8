//! Response memoization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arcnet_protocol::{PlayerId, Value};
use tokio::time::Instant;

use super::{Callback, Middleware, Rejection, RemoteInfo, Sender};

/// Whether cached results are shared across callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    /// One result for every caller.
    Global,
    /// One result per sender.
    PerCaller,
}

type Entries = Mutex<HashMap<Option<Sender>, (Instant, Value)>>;

/// Answers calls from a remembered result for `window` after the callback
/// last ran.
///
/// Arguments are not part of the key. Rejected calls are never cached.
#[derive(Clone)]
pub struct Cache {
    scope: CacheScope,
    window: Duration,
    entries: Arc<Entries>,
}

impl Cache {
    pub fn global(window: Duration) -> Self {
        Self::new(CacheScope::Global, window)
    }

    pub fn per_caller(window: Duration) -> Self {
        Self::new(CacheScope::PerCaller, window)
    }

    fn new(scope: CacheScope, window: Duration) -> Self {
        Self {
            scope,
            window,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    /// Forgets every remembered result.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn key(&self, sender: &Sender) -> Option<Sender> {
        match self.scope {
            CacheScope::Global => None,
            CacheScope::PerCaller => Some(*sender),
        }
    }

    fn lookup(&self, key: &Option<Sender>) -> Option<Value> {
        let entries = self.lock();
        let (stored_at, value) = entries.get(key)?;
        (stored_at.elapsed() < self.window).then(|| value.clone())
    }

    fn store(&self, key: Option<Sender>, value: Value) {
        self.lock().insert(key, (Instant::now(), value));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Option<Sender>, (Instant, Value)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Middleware for Cache {
    fn wrap(&self, next: Callback, remote: &RemoteInfo) -> Callback {
        let cache = self.clone();
        let name = remote.name().to_owned();
        Arc::new(move |sender: &Sender, args: Vec<Value>| -> Result<Value, Rejection> {
            let key = cache.key(sender);
            if let Some(value) = cache.lookup(&key) {
                tracing::trace!(remote = %name, %sender, "cache hit");
                return Ok(value);
            }
            // The callback runs unlocked; concurrent misses may both run it.
            let value = next(sender, args)?;
            cache.store(key, value.clone());
            Ok(value)
        })
    }

    fn on_disconnect(&self, player: PlayerId) {
        if self.scope == CacheScope::PerCaller {
            self.lock().remove(&Some(Sender::Player(player)));
        }
    }
}
