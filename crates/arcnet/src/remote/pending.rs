//! Outstanding function calls awaiting a response.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use arcnet_protocol::{Payload, PlayerId};
use tokio::sync::oneshot;

pub(crate) type CallResult = Result<Payload, String>;

struct Pending {
    /// The player expected to answer. `None` when the server answers.
    responder: Option<PlayerId>,
    tx: oneshot::Sender<CallResult>,
}

/// Request ids and their continuations for one live function.
pub(crate) struct PendingCalls {
    next_id: AtomicU64,
    calls: Mutex<HashMap<u64, Pending>>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a call and returns its request id.
    pub(crate) fn start(&self, responder: Option<PlayerId>) -> (u64, oneshot::Receiver<CallResult>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, Pending { responder, tx });
        (id, rx)
    }

    /// Resolves call `id` with `result`. Responses from anyone other than
    /// the addressed responder are ignored. Returns `false` if nothing was
    /// waiting.
    pub(crate) fn complete(&self, id: u64, from: Option<PlayerId>, result: CallResult) -> bool {
        let pending = {
            let mut calls = self.lock();
            match calls.get(&id) {
                Some(pending) if pending.responder == from => calls.remove(&id),
                _ => None,
            }
        };
        match pending {
            // The caller may have stopped waiting in the meantime.
            Some(pending) => pending.tx.send(result).is_ok(),
            None => false,
        }
    }

    pub(crate) fn cancel(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Cancels call `id` when the returned guard drops, so a caller that
    /// stops waiting never leaves its entry behind.
    pub(crate) fn guard(&self, id: u64) -> CallGuard<'_> {
        CallGuard { calls: self, id }
    }

    /// Fails every call addressed to `player`.
    pub(crate) fn abandon(&self, player: PlayerId) {
        let mut calls = self.lock();
        // Dropping the senders wakes the callers with a closed channel.
        calls.retain(|_, pending| pending.responder != Some(player));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Pending>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its call from [`PendingCalls`] on drop. Removing an already
/// completed call is a no-op.
pub(crate) struct CallGuard<'a> {
    calls: &'a PendingCalls,
    id: u64,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.calls.cancel(self.id);
    }
}
