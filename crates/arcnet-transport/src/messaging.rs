//! Cross-process messaging.
//!
//! Server processes that make up one game talk through a topic-based
//! message bus. Broadcast remotes publish framed [`BroadcastEnvelope`]s
//! here; the bus itself only moves bytes.
//!
//! [`BroadcastEnvelope`]: arcnet_protocol::BroadcastEnvelope

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::TransportError;

/// Receives one published message.
pub type MessageHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// A topic-based publish/subscribe bus shared by server processes.
pub trait MessagingService: Send + Sync + 'static {
    /// Publishes `data` to every subscriber of `topic`, including
    /// subscribers in the publishing process.
    fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), TransportError>;

    /// Adds a subscriber to `topic`.
    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError>;
}

type Subscribers = Mutex<HashMap<String, Vec<MessageHandler>>>;

/// An in-process [`MessagingService`].
///
/// Clones share one bus, so a test can hand a clone to each simulated
/// server process. Messages are delivered in publish order from a single
/// pump task.
#[derive(Clone)]
pub struct MemoryMessaging {
    tx: mpsc::UnboundedSender<(String, Vec<u8>)>,
    subscribers: Arc<Subscribers>,
}

impl MemoryMessaging {
    /// Creates a bus. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscribers = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(pump(Arc::clone(&subscribers), rx));
        Self { tx, subscribers }
    }
}

impl Default for MemoryMessaging {
    fn default() -> Self {
        Self::new()
    }
}

async fn pump(subscribers: Arc<Subscribers>, mut rx: mpsc::UnboundedReceiver<(String, Vec<u8>)>) {
    while let Some((topic, data)) = rx.recv().await {
        let handlers = subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .cloned()
            .unwrap_or_default();
        tracing::trace!(topic, subscribers = handlers.len(), "delivering message");
        for handler in handlers {
            handler(data.clone());
        }
    }
}

impl MessagingService for MemoryMessaging {
    fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), TransportError> {
        self.tx
            .send((topic.to_owned(), data))
            .map_err(|_| TransportError::Shutdown)
    }

    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_owned())
            .or_default()
            .push(handler);
        Ok(())
    }
}
