use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use arcnet_transport::ClientTransport;

use super::Role;
use super::server::wrong_kind;
use crate::definitions::{Declaration, RemoteDeclarations, RemoteKind};
use crate::error::ContextError;
use crate::remote::{ClientEvent, ClientFunction};

/// A live client-side remote of any kind.
#[derive(Clone)]
pub enum ClientRemote {
    Event(Arc<ClientEvent>),
    Function(Arc<ClientFunction>),
}

impl ClientRemote {
    pub fn kind(&self) -> RemoteKind {
        match self {
            Self::Event(_) => RemoteKind::Event,
            Self::Function(_) => RemoteKind::Function,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Event(e) => e.name(),
            Self::Function(f) => f.name(),
        }
    }
}

/// Everything a client needs to build its live remotes.
pub struct ClientFactory {
    transport: Arc<dyn ClientTransport>,
}

impl ClientFactory {
    pub fn new(transport: Arc<dyn ClientTransport>) -> Self {
        Self { transport }
    }

    fn create(&self, name: &str, declaration: Declaration) -> Result<ClientRemote, ContextError> {
        let transport = Arc::clone(&self.transport);
        match declaration.kind() {
            RemoteKind::Event => Ok(ClientRemote::Event(Arc::new(ClientEvent::new(
                name,
                declaration,
                transport,
            )))),
            RemoteKind::Function => Ok(ClientRemote::Function(Arc::new(ClientFunction::new(
                name,
                declaration,
                transport,
            )))),
            // Builders never resolve a client-side broadcast.
            RemoteKind::Broadcast => Err(ContextError::ServerOnly(name.to_owned())),
        }
    }
}

type Remotes = HashMap<String, ClientRemote>;

/// A client's live remotes, built once on first use.
pub struct ClientRegistry {
    declarations: RemoteDeclarations,
    role: Role,
    factory: ClientFactory,
    remotes: OnceLock<Result<Remotes, ContextError>>,
}

impl ClientRegistry {
    pub fn new(declarations: RemoteDeclarations, role: Role, factory: ClientFactory) -> Self {
        Self {
            declarations,
            role,
            factory,
            remotes: OnceLock::new(),
        }
    }

    /// Builds every client-side remote. Later calls return the first
    /// outcome.
    pub fn init(&self) -> Result<(), ContextError> {
        self.remotes().map(|_| ())
    }

    pub fn declarations(&self) -> &RemoteDeclarations {
        &self.declarations
    }

    pub fn get(&self, name: &str) -> Result<ClientRemote, ContextError> {
        if let Some(remote) = self.remotes()?.get(name) {
            return Ok(remote.clone());
        }
        match self.declarations.get(name) {
            Some(sides) if sides.server.is_some() => Err(ContextError::ServerOnly(name.to_owned())),
            _ => Err(ContextError::UnknownRemote(name.to_owned())),
        }
    }

    pub fn event(&self, name: &str) -> Result<Arc<ClientEvent>, ContextError> {
        match self.get(name)? {
            ClientRemote::Event(event) => Ok(event),
            other => Err(wrong_kind(name, RemoteKind::Event, other.kind())),
        }
    }

    pub fn function(&self, name: &str) -> Result<Arc<ClientFunction>, ContextError> {
        match self.get(name)? {
            ClientRemote::Function(function) => Ok(function),
            other => Err(wrong_kind(name, RemoteKind::Function, other.kind())),
        }
    }

    fn remotes(&self) -> Result<&Remotes, ContextError> {
        if self.role != Role::Client {
            return Err(ContextError::NotClient);
        }
        self.remotes
            .get_or_init(|| self.build())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn build(&self) -> Result<Remotes, ContextError> {
        let mut remotes = HashMap::new();
        for (name, sides) in self.declarations.iter() {
            let Some(declaration) = &sides.client else {
                continue;
            };
            remotes.insert(name.to_owned(), self.factory.create(name, declaration.clone())?);
        }
        tracing::info!(remotes = remotes.len(), "client registry initialized");
        Ok(remotes)
    }
}
