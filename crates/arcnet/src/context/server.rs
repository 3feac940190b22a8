use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use arcnet_protocol::{JobId, PlayerId};
use arcnet_transport::{MessagingService, ServerTransport};
use rand::Rng;

use super::Role;
use crate::definitions::{Declaration, RemoteDeclarations, RemoteKind};
use crate::error::ContextError;
use crate::middleware::Middleware;
use crate::remote::{ServerBroadcast, ServerEvent, ServerFunction};
use crate::sentinel::Sentinel;

// ---------------------------------------------------------------------------
// ServerRemote
// ---------------------------------------------------------------------------

/// A live server-side remote of any kind.
#[derive(Clone)]
pub enum ServerRemote {
    Event(Arc<ServerEvent>),
    Function(Arc<ServerFunction>),
    Broadcast(Arc<ServerBroadcast>),
}

impl ServerRemote {
    pub fn kind(&self) -> RemoteKind {
        match self {
            Self::Event(_) => RemoteKind::Event,
            Self::Function(_) => RemoteKind::Function,
            Self::Broadcast(_) => RemoteKind::Broadcast,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Event(e) => e.name(),
            Self::Function(f) => f.name(),
            Self::Broadcast(b) => b.name(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerFactory
// ---------------------------------------------------------------------------

/// Everything a server needs to build its live remotes.
pub struct ServerFactory {
    transport: Arc<dyn ServerTransport>,
    messaging: Option<Arc<dyn MessagingService>>,
    sentinel: Sentinel,
    job_id: JobId,
}

impl ServerFactory {
    /// A factory with a fresh sentinel and a random job id.
    pub fn new(transport: Arc<dyn ServerTransport>) -> Self {
        Self {
            transport,
            messaging: None,
            sentinel: Sentinel::new(),
            job_id: random_job_id(),
        }
    }

    /// The bus broadcasts publish to. Required if the model declares any.
    pub fn with_messaging(mut self, messaging: Arc<dyn MessagingService>) -> Self {
        self.messaging = Some(messaging);
        self
    }

    pub fn with_sentinel(mut self, sentinel: Sentinel) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = job_id;
        self
    }

    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn create(&self, name: &str, declaration: Declaration) -> Result<ServerRemote, ContextError> {
        let transport = Arc::clone(&self.transport);
        let sentinel = self.sentinel.clone();
        let remote = match declaration.kind() {
            RemoteKind::Event => {
                ServerRemote::Event(Arc::new(ServerEvent::new(name, declaration, transport, sentinel)))
            }
            RemoteKind::Function => ServerRemote::Function(Arc::new(ServerFunction::new(
                name,
                declaration,
                transport,
                sentinel,
            ))),
            RemoteKind::Broadcast => {
                let messaging = self
                    .messaging
                    .clone()
                    .ok_or_else(|| ContextError::MissingMessaging(name.to_owned()))?;
                ServerRemote::Broadcast(Arc::new(ServerBroadcast::new(
                    name,
                    declaration,
                    messaging,
                    self.job_id.clone(),
                    sentinel,
                )?))
            }
        };
        Ok(remote)
    }
}

fn random_job_id() -> JobId {
    JobId::new(format!("{:016x}", rand::rng().random::<u64>()))
}

// ---------------------------------------------------------------------------
// ServerRegistry
// ---------------------------------------------------------------------------

type Remotes = HashMap<String, ServerRemote>;

/// The server's live remotes, built once on first use.
pub struct ServerRegistry {
    declarations: RemoteDeclarations,
    role: Role,
    factory: ServerFactory,
    remotes: OnceLock<Result<Remotes, ContextError>>,
}

impl ServerRegistry {
    pub fn new(declarations: RemoteDeclarations, role: Role, factory: ServerFactory) -> Self {
        Self {
            declarations,
            role,
            factory,
            remotes: OnceLock::new(),
        }
    }

    /// Builds every server-side remote. Later calls return the first
    /// outcome.
    pub fn init(&self) -> Result<(), ContextError> {
        self.remotes().map(|_| ())
    }

    pub fn declarations(&self) -> &RemoteDeclarations {
        &self.declarations
    }

    pub fn sentinel(&self) -> &Sentinel {
        self.factory.sentinel()
    }

    pub fn job_id(&self) -> &JobId {
        self.factory.job_id()
    }

    /// The live remote named `name`.
    pub fn get(&self, name: &str) -> Result<ServerRemote, ContextError> {
        if let Some(remote) = self.remotes()?.get(name) {
            return Ok(remote.clone());
        }
        match self.declarations.get(name) {
            Some(sides) if sides.client.is_some() => Err(ContextError::ClientOnly(name.to_owned())),
            _ => Err(ContextError::UnknownRemote(name.to_owned())),
        }
    }

    pub fn event(&self, name: &str) -> Result<Arc<ServerEvent>, ContextError> {
        match self.get(name)? {
            ServerRemote::Event(event) => Ok(event),
            other => Err(wrong_kind(name, RemoteKind::Event, other.kind())),
        }
    }

    pub fn function(&self, name: &str) -> Result<Arc<ServerFunction>, ContextError> {
        match self.get(name)? {
            ServerRemote::Function(function) => Ok(function),
            other => Err(wrong_kind(name, RemoteKind::Function, other.kind())),
        }
    }

    pub fn broadcast(&self, name: &str) -> Result<Arc<ServerBroadcast>, ContextError> {
        match self.get(name)? {
            ServerRemote::Broadcast(broadcast) => Ok(broadcast),
            other => Err(wrong_kind(name, RemoteKind::Broadcast, other.kind())),
        }
    }

    fn remotes(&self) -> Result<&Remotes, ContextError> {
        if self.role != Role::Server {
            return Err(ContextError::NotServer);
        }
        self.remotes
            .get_or_init(|| self.build())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn build(&self) -> Result<Remotes, ContextError> {
        let mut remotes = HashMap::new();
        let mut stateful: Vec<Arc<dyn Middleware>> = Vec::new();
        for (name, sides) in self.declarations.iter() {
            let Some(declaration) = &sides.server else {
                continue;
            };
            stateful.extend(declaration.callback_middleware().iter().cloned());
            let remote = self.factory.create(name, declaration.clone()).inspect_err(|e| {
                tracing::error!(remote = name, error = %e, "failed to create server remote");
            })?;
            remotes.insert(name.to_owned(), remote);
        }

        if !stateful.is_empty() {
            self.factory
                .transport
                .on_disconnect(Arc::new(move |player: PlayerId| {
                    for link in &stateful {
                        link.on_disconnect(player);
                    }
                }));
        }

        tracing::info!(
            remotes = remotes.len(),
            job_id = %self.factory.job_id,
            "server registry initialized"
        );
        Ok(remotes)
    }
}

pub(super) fn wrong_kind(name: &str, expected: RemoteKind, found: RemoteKind) -> ContextError {
    ContextError::WrongKind {
        name: name.to_owned(),
        expected,
        found,
    }
}
