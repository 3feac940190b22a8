//! Per-sender call rate limiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::time::Duration;

use arcnet_protocol::Value;
use tokio::time::{Instant, MissedTickBehavior};

use super::{Callback, Middleware, Rejection, RemoteInfo, Sender};
use crate::sentinel::SentinelEvent;

type Counters = Mutex<HashMap<Sender, u32>>;

/// Allows each sender `requests_per_window` calls per window.
///
/// The counter for a sender is incremented and compared under one lock,
/// so concurrent calls can't both slip under the cap. All counters are
/// cleared together every `window` by a background task spawned the first
/// time the limiter is attached to a remote; [`RateLimit::reset`] clears
/// them on demand.
///
/// Clones share counters, so a handle kept by the application can reset
/// the limiter a declaration uses.
#[derive(Clone)]
pub struct RateLimit {
    limit: u32,
    window: Duration,
    counters: Arc<Counters>,
    reset_task: Arc<OnceLock<()>>,
}

impl RateLimit {
    pub fn new(requests_per_window: u32, window: Duration) -> Self {
        Self {
            limit: requests_per_window,
            window,
            counters: Arc::new(Mutex::new(HashMap::new())),
            reset_task: Arc::new(OnceLock::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Clears every sender's counter.
    pub fn reset(&self) {
        clear(&self.counters);
    }

    /// Counts a call from `sender`; `false` once the sender is over the
    /// limit for this window.
    fn admit(&self, sender: &Sender) -> bool {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let count = counters.entry(*sender).or_insert(0);
        *count = count.saturating_add(1);
        *count <= self.limit
    }

    fn start_reset_task(&self) {
        self.reset_task.get_or_init(|| {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                tracing::warn!("no Tokio runtime, rate limit counters reset only on demand");
                return;
            };
            let counters = Arc::downgrade(&self.counters);
            runtime.spawn(reset_loop(counters, self.window));
        });
    }
}

fn clear(counters: &Counters) {
    counters
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// Clears the counters every `window` until the limiter is dropped.
async fn reset_loop(counters: Weak<Counters>, window: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + window, window);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(counters) = counters.upgrade() else {
            break;
        };
        clear(&counters);
        tracing::trace!("rate limit window reset");
    }
}

impl Middleware for RateLimit {
    fn wrap(&self, next: Callback, remote: &RemoteInfo) -> Callback {
        self.start_reset_task();
        let limiter = self.clone();
        let remote = remote.clone();
        Arc::new(move |sender: &Sender, args: Vec<Value>| {
            if limiter.admit(sender) {
                return next(sender, args);
            }
            remote.report(SentinelEvent::RateLimitExceeded {
                remote: remote.name().to_owned(),
                player: sender.player(),
                limit: limiter.limit,
            });
            Err(Rejection::new("rate limit exceeded"))
        })
    }
}
