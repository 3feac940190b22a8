//! Handler tables shared by every transport implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use arcnet_protocol::PlayerId;

use crate::DisconnectHandler;

/// Receive handlers keyed by remote name.
pub(crate) struct HandlerTable<H> {
    handlers: Mutex<HashMap<String, H>>,
}

impl<H: Clone> HandlerTable<H> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, H>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, remote: &str, handler: H) {
        if self.lock().insert(remote.to_owned(), handler).is_some() {
            tracing::warn!(remote, "replaced receive handler");
        }
    }

    /// Clones the handler out so it runs without the table locked.
    pub(crate) fn get(&self, remote: &str) -> Option<H> {
        let handler = self.lock().get(remote).cloned();
        if handler.is_none() {
            tracing::debug!(remote, "no handler for remote, dropping envelope");
        }
        handler
    }
}

/// Disconnect callbacks, fired in registration order.
pub(crate) struct DisconnectHandlers {
    handlers: Mutex<Vec<DisconnectHandler>>,
}

impl DisconnectHandlers {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, handler: DisconnectHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub(crate) fn fire(&self, player: PlayerId) {
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler(player);
        }
    }
}
