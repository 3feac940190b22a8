//! Structured reporting of rejected inbound calls.
//!
//! Receivers never surface schema or decode failures to the caller. They
//! drop the call and report it here instead. Every report is logged; once
//! [`Sentinel::enable`] has been called, reports are also published on a
//! broadcast channel for anti-abuse tooling to consume.
//!
//! Each server context owns one sentinel and hands clones of it to its
//! remotes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arcnet_protocol::PlayerId;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// One rejected inbound call.
///
/// `player` is `None` for calls that don't come from a player (broadcasts
/// from another server process).
#[derive(Debug, Clone, PartialEq)]
pub enum SentinelEvent {
    /// An argument failed its type's validator or deserializer.
    ValidationError {
        remote: String,
        player: Option<PlayerId>,
        index: usize,
        type_name: String,
        message: String,
    },

    /// A buffer-mode payload could not be decoded. `type_name` is the
    /// declared type of the argument that failed.
    BufferDecodeError {
        remote: String,
        player: Option<PlayerId>,
        index: usize,
        type_name: String,
        message: String,
    },

    /// The call carried too few (or, when enforced, too many) arguments.
    ArgumentCountMismatch {
        remote: String,
        player: Option<PlayerId>,
        arg_count: usize,
        expected_count: usize,
    },

    /// A filter predicate rejected the caller.
    PredicateRejected {
        remote: String,
        player: Option<PlayerId>,
    },

    /// The caller exceeded a rate limit.
    RateLimitExceeded {
        remote: String,
        player: Option<PlayerId>,
        limit: u32,
    },
}

impl SentinelEvent {
    /// The remote the rejected call was addressed to.
    pub fn remote(&self) -> &str {
        match self {
            Self::ValidationError { remote, .. }
            | Self::BufferDecodeError { remote, .. }
            | Self::ArgumentCountMismatch { remote, .. }
            | Self::PredicateRejected { remote, .. }
            | Self::RateLimitExceeded { remote, .. } => remote,
        }
    }

    /// The player who made the rejected call, if any.
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::ValidationError { player, .. }
            | Self::BufferDecodeError { player, .. }
            | Self::ArgumentCountMismatch { player, .. }
            | Self::PredicateRejected { player, .. }
            | Self::RateLimitExceeded { player, .. } => *player,
        }
    }

    pub(crate) fn log(&self) {
        let remote = self.remote();
        let player = self.player();
        match self {
            Self::ValidationError {
                index,
                type_name,
                message,
                ..
            } => tracing::warn!(
                remote,
                ?player,
                index = *index,
                %type_name,
                %message,
                "argument failed validation"
            ),
            Self::BufferDecodeError {
                index,
                type_name,
                message,
                ..
            } => tracing::warn!(
                remote,
                ?player,
                index = *index,
                %type_name,
                %message,
                "buffer decode failed"
            ),
            Self::ArgumentCountMismatch {
                arg_count,
                expected_count,
                ..
            } => tracing::warn!(
                remote,
                ?player,
                arg_count = *arg_count,
                expected_count = *expected_count,
                "argument count mismatch"
            ),
            Self::PredicateRejected { .. } => {
                tracing::info!(remote, ?player, "call rejected by filter")
            }
            Self::RateLimitExceeded { limit, .. } => {
                tracing::warn!(remote, ?player, limit = *limit, "rate limit exceeded")
            }
        }
    }
}

struct Inner {
    enabled: AtomicBool,
    tx: broadcast::Sender<SentinelEvent>,
}

/// The observability sink for one server context. Cheap to clone.
#[derive(Clone)]
pub struct Sentinel {
    inner: Arc<Inner>,
}

impl Sentinel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Starts publishing events. Calling it again has no effect.
    pub fn enable(&self) {
        if !self.inner.enabled.swap(true, Ordering::SeqCst) {
            tracing::info!("sentinel enabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Receives every event reported after this call (while enabled).
    pub fn subscribe(&self) -> broadcast::Receiver<SentinelEvent> {
        self.inner.tx.subscribe()
    }

    /// Logs `event` and, if enabled, publishes it.
    pub fn report(&self, event: SentinelEvent) {
        event.log();
        if self.is_enabled() {
            // No subscribers is fine.
            let _ = self.inner.tx.send(event);
        }
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sentinel")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
