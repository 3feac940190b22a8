//! Server-to-server messages over the messaging service.
//!
//! Every server process subscribes to the topic `arcnet.<name>`. A send
//! publishes a [`BroadcastEnvelope`] framed by [`JsonCodec`]; each
//! subscriber drops envelopes addressed to another job, then runs the
//! payload through the usual receive pipeline with [`Sender::Server`] as
//! the caller.

use std::sync::Arc;

use arcnet_protocol::{BroadcastEnvelope, Codec, JobId, JsonCodec, Value};
use arcnet_transport::MessagingService;

use super::{ListenerId, Listeners, RemoteCore};
use crate::definitions::Declaration;
use crate::error::{ContextError, NetError};
use crate::middleware::{Callback, Rejection, Sender};
use crate::sentinel::Sentinel;

/// Called with the publishing job and the decoded arguments.
pub type BroadcastListener = dyn Fn(JobId, Vec<Value>) + Send + Sync;

const TOPIC_PREFIX: &str = "arcnet.";

/// The messaging topic a broadcast named `name` uses.
pub(crate) fn topic(name: &str) -> String {
    format!("{TOPIC_PREFIX}{name}")
}

/// A server's handle on a broadcast.
pub struct ServerBroadcast {
    core: Arc<RemoteCore>,
    messaging: Arc<dyn MessagingService>,
    job_id: JobId,
    topic: String,
    listeners: Arc<Listeners<BroadcastListener>>,
}

impl ServerBroadcast {
    pub(crate) fn new(
        name: &str,
        declaration: Declaration,
        messaging: Arc<dyn MessagingService>,
        job_id: JobId,
        sentinel: Sentinel,
    ) -> Result<Self, ContextError> {
        let core = Arc::new(RemoteCore::new(name, declaration, Some(sentinel)));
        let listeners: Arc<Listeners<BroadcastListener>> = Arc::new(Listeners::new());
        let topic = topic(name);

        // The chain's result carries the arguments as they left it; the
        // source job is attached afterwards.
        let inner: Callback = Arc::new(|_: &Sender, args: Vec<Value>| -> Result<Value, Rejection> {
            Ok(Value::Array(args))
        });
        let callback = core.compose(inner);

        let receiver = Arc::clone(&core);
        let dispatch = Arc::clone(&listeners);
        let local_job = job_id.clone();
        messaging
            .subscribe(
                &topic,
                Arc::new(move |data: Vec<u8>| {
                    let envelope: BroadcastEnvelope = match JsonCodec.decode(&data) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            tracing::warn!(remote = receiver.name(), error = %e, "malformed broadcast frame");
                            return;
                        }
                    };
                    if !envelope.is_addressed_to(&local_job) {
                        tracing::trace!(remote = receiver.name(), target = ?envelope.target, "broadcast for another job");
                        return;
                    }
                    let Some(args) = receiver.inbound(envelope.payload, &Sender::Server) else {
                        return;
                    };
                    let args = match callback(&Sender::Server, args) {
                        Ok(Value::Array(args)) => args,
                        Ok(other) => vec![other],
                        Err(rejection) => {
                            tracing::debug!(remote = receiver.name(), reason = %rejection, "broadcast dropped");
                            return;
                        }
                    };
                    for listener in dispatch.snapshot() {
                        listener(envelope.source.clone(), args.clone());
                    }
                }),
            )
            .map_err(|e| ContextError::Attach {
                name: name.to_owned(),
                message: e.to_string(),
            })?;

        tracing::debug!(remote = name, %job_id, %topic, "broadcast subscribed");
        Ok(Self {
            core,
            messaging,
            job_id,
            topic,
            listeners,
        })
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn declaration(&self) -> &Declaration {
        self.core.declaration()
    }

    /// This server process's job id.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Calls `listener` for every broadcast addressed to this job.
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(JobId, Vec<Value>) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    pub fn disconnect(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Publishes to every server process, this one included.
    pub fn send_to_all_servers(&self, args: Vec<Value>) -> Result<(), NetError> {
        self.publish(None, args)
    }

    /// Publishes to the server process running `job`.
    pub fn send_to_server(&self, job: JobId, args: Vec<Value>) -> Result<(), NetError> {
        self.publish(Some(job), args)
    }

    fn publish(&self, target: Option<JobId>, args: Vec<Value>) -> Result<(), NetError> {
        let envelope = BroadcastEnvelope {
            source: self.job_id.clone(),
            target,
            payload: self.core.outbound(args)?,
        };
        let frame = JsonCodec.encode(&envelope)?;
        self.messaging.publish(&self.topic, frame)?;
        Ok(())
    }
}
