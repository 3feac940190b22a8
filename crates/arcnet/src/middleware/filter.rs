//! Predicate gates for the receive and send paths.

use std::sync::Arc;

use arcnet_protocol::Value;

use super::{Callback, InvokeFn, InvokeMiddleware, Middleware, Rejection, RemoteInfo, Sender};
use crate::sentinel::SentinelEvent;

type Predicate = dyn Fn(&Sender, &[Value]) -> bool + Send + Sync;
type InvokePredicate = dyn Fn(&[Value]) -> bool + Send + Sync;

/// Drops inbound calls the predicate returns `false` for.
#[derive(Clone)]
pub struct Filter {
    predicate: Arc<Predicate>,
}

impl Filter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Sender, &[Value]) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl Middleware for Filter {
    fn wrap(&self, next: Callback, remote: &RemoteInfo) -> Callback {
        let predicate = Arc::clone(&self.predicate);
        let remote = remote.clone();
        Arc::new(move |sender: &Sender, args: Vec<Value>| {
            if predicate(sender, &args) {
                return next(sender, args);
            }
            remote.report(SentinelEvent::PredicateRejected {
                remote: remote.name().to_owned(),
                player: sender.player(),
            });
            Err(Rejection::new("rejected by filter"))
        })
    }
}

/// Vetoes sends the predicate returns `false` for. Nothing reaches the
/// wire.
#[derive(Clone)]
pub struct InvokeFilter {
    predicate: Arc<InvokePredicate>,
}

impl InvokeFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl InvokeMiddleware for InvokeFilter {
    fn wrap(&self, next: InvokeFn, remote: &RemoteInfo) -> InvokeFn {
        let predicate = Arc::clone(&self.predicate);
        let name = remote.name().to_owned();
        Arc::new(move |args: Vec<Value>| {
            if predicate(&args) {
                next(args)
            } else {
                tracing::debug!(remote = %name, "send vetoed by filter");
                Err(Rejection::new("send vetoed by filter"))
            }
        })
    }
}
