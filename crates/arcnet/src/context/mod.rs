//! The dispatch registry.
//!
//! A process plays one [`Role`]. Its registry for that role builds every
//! live remote declared for its side the first time it is used (guarded by
//! a `OnceLock`, so concurrent first lookups build once) and hands out
//! typed handles by name:
//!
//! ```text
//! ContextModel ─┬─ ServerRegistry ── ServerFactory (transport, messaging, sentinel, job id)
//!               └─ ClientRegistry ── ClientFactory (transport)
//! ```

mod client;
mod server;

pub use client::{ClientFactory, ClientRegistry, ClientRemote};
pub use server::{ServerFactory, ServerRegistry, ServerRemote};

use crate::definitions::RemoteDeclarations;
use crate::error::ContextError;

/// Which end of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Server,
    Client,
}

/// A process's view of the model: the registry for the role it plays.
pub struct ContextModel {
    role: Role,
    server: Option<ServerRegistry>,
    client: Option<ClientRegistry>,
}

impl ContextModel {
    /// The model as seen by the server process.
    pub fn server(declarations: RemoteDeclarations, factory: ServerFactory) -> Self {
        Self {
            role: Role::Server,
            server: Some(ServerRegistry::new(declarations, Role::Server, factory)),
            client: None,
        }
    }

    /// The model as seen by a client process.
    pub fn client(declarations: RemoteDeclarations, factory: ClientFactory) -> Self {
        Self {
            role: Role::Client,
            server: None,
            client: Some(ClientRegistry::new(declarations, Role::Client, factory)),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Builds every live remote for this process's role.
    pub fn init(&self) -> Result<(), ContextError> {
        match self.role {
            Role::Server => self.server_registry()?.init(),
            Role::Client => self.client_registry()?.init(),
        }
    }

    pub fn server_registry(&self) -> Result<&ServerRegistry, ContextError> {
        self.server.as_ref().ok_or(ContextError::NotServer)
    }

    pub fn client_registry(&self) -> Result<&ClientRegistry, ContextError> {
        self.client.as_ref().ok_or(ContextError::NotClient)
    }

    /// A handle for the remote named `name`. Nothing is looked up until a
    /// side is asked for.
    pub fn get<'a>(&'a self, name: &'a str) -> RemoteHandle<'a> {
        RemoteHandle { model: self, name }
    }
}

/// One name in a [`ContextModel`], not yet resolved to a side.
#[derive(Clone, Copy)]
pub struct RemoteHandle<'a> {
    model: &'a ContextModel,
    name: &'a str,
}

impl RemoteHandle<'_> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// The server-side remote. Fails with `NotServer` on a client.
    pub fn server(&self) -> Result<ServerRemote, ContextError> {
        self.model.server_registry()?.get(self.name)
    }

    /// The client-side remote. Fails with `NotClient` on the server.
    pub fn client(&self) -> Result<ClientRemote, ContextError> {
        self.model.client_registry()?.get(self.name)
    }
}
