//! # Arcnet
//!
//! Declarative, typed remote events and functions for game servers.
//!
//! Declare each remote once, with the network types of its arguments, and
//! Arcnet hands out matched server and client handles that validate,
//! serialize and dispatch every call across the connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcnet::prelude::*;
//!
//! # async fn run() -> Result<(), NetError> {
//! let declarations = RemoteDeclarations::builder(NetConfig::default())
//!     .add("PrintMessage", EventBuilder::new().arg(NetworkType::string()))
//!     .build()?;
//!
//! let network = MemoryNetwork::new();
//! let server = ContextModel::server(declarations.clone(), ServerFactory::new(network.server()));
//! let client = ContextModel::client(declarations, ClientFactory::new(network.connect()));
//!
//! server
//!     .server_registry()?
//!     .event("PrintMessage")?
//!     .connect(|player, args| println!("{player}: {args:?}"));
//! client
//!     .client_registry()?
//!     .event("PrintMessage")?
//!     .send_to_server(vec![Value::from("Hello, World!")])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! - [`arcnet_protocol`]: values, ids and envelopes on the wire.
//! - [`arcnet_types`]: network types and the argument pipeline.
//! - [`arcnet_transport`]: transports and the messaging service.
//! - this crate: declarations, middleware, live remotes and the registry.

mod config;
mod error;
mod flags;
mod sentinel;

pub mod context;
pub mod definitions;
pub mod logging;
pub mod middleware;
pub mod remote;

pub use config::NetConfig;
pub use context::{
    ClientFactory, ClientRegistry, ClientRemote, ContextModel, RemoteHandle, Role, ServerFactory,
    ServerRegistry, ServerRemote,
};
pub use definitions::{
    BroadcastBuilder, DEFAULT_FUNCTION_TIMEOUT, Declaration, DeclarationBuilder, EventBuilder,
    FunctionBuilder, RemoteDeclarations, RemoteKind, Side,
};
pub use error::{ContextError, DefinitionError, NetError};
pub use flags::Flags;
pub use remote::{
    BoundClientFunction, BoundServerFunction, ClientEvent, ClientFunction, ListenerId,
    ServerBroadcast, ServerEvent, ServerFunction,
};
pub use sentinel::{Sentinel, SentinelEvent};

pub use arcnet_protocol::{JobId, ObjectId, PlayerId, Reliability, Value};
pub use arcnet_types::{NetEnum, NetworkType};

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::middleware::{Cache, Filter, InvokeFilter, RateLimit, Sender};
    pub use crate::{
        BroadcastBuilder, ClientFactory, ContextModel, EventBuilder, FunctionBuilder, JobId,
        NetConfig, NetEnum, NetError, NetworkType, ObjectId, PlayerId, RemoteDeclarations,
        ServerFactory, Value,
    };
    pub use arcnet_transport::{MemoryMessaging, MemoryNetwork};
}
