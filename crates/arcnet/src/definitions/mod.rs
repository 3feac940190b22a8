//! Declarations: the frozen description of one remote on one side.
//!
//! A builder ([`EventBuilder`], [`FunctionBuilder`], [`BroadcastBuilder`])
//! collects argument types, feature overrides and middleware. Resolving it
//! with `on_server` / `on_client` against the model's [`NetConfig`] yields an
//! immutable [`Declaration`]; [`RemoteDeclarations`] collects them by name.
//!
//! ```rust
//! use std::time::Duration;
//! use arcnet::{EventBuilder, FunctionBuilder, NetConfig, NetworkType, RemoteDeclarations};
//!
//! let declarations = RemoteDeclarations::builder(NetConfig::default())
//!     .add("Chat", EventBuilder::new().arg(NetworkType::string()).unreliable())
//!     .add(
//!         "GetScore",
//!         FunctionBuilder::new()
//!             .arg(NetworkType::player())
//!             .returns(NetworkType::uint32())
//!             .timeout(Duration::from_secs(2)),
//!     )
//!     .build()
//!     .unwrap();
//! assert_eq!(declarations.len(), 2);
//! ```

mod broadcast;
mod declarations;
mod event;
mod function;

pub use broadcast::BroadcastBuilder;
pub use declarations::{RemoteDeclarations, RemoteDeclarationsBuilder, SideDeclarations};
pub use event::EventBuilder;
pub use function::{DEFAULT_FUNCTION_TIMEOUT, FunctionBuilder};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arcnet_protocol::Reliability;
use arcnet_types::NetworkType;

use crate::config::NetConfig;
use crate::error::DefinitionError;
use crate::flags::Flags;
use crate::middleware::{InvokeMiddleware, Middleware};

/// Which end of the connection owns a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Server,
    Client,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// The family a remote belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKind {
    /// Fire-and-forget, either direction.
    Event,
    /// Request/response with a timeout.
    Function,
    /// Server to server across processes.
    Broadcast,
}

// ---------------------------------------------------------------------------
// Declaration
// ---------------------------------------------------------------------------

struct Inner {
    kind: RemoteKind,
    side: Side,
    arguments: Arc<[NetworkType]>,
    returns: Option<NetworkType>,
    flags: Flags,
    reliability: Reliability,
    timeout: Option<Duration>,
    identity_bound: bool,
    callback_middleware: Vec<Arc<dyn Middleware>>,
    invoke_middleware: Vec<Arc<dyn InvokeMiddleware>>,
}

/// The resolved, immutable description of one remote on one side.
///
/// Cheap to clone. Nothing about it changes after `on_server` /
/// `on_client` returns it.
#[derive(Clone)]
pub struct Declaration {
    inner: Arc<Inner>,
}

impl Declaration {
    pub fn kind(&self) -> RemoteKind {
        self.inner.kind
    }

    pub fn side(&self) -> Side {
        self.inner.side
    }

    /// Argument types, including the leading object id of an
    /// identity-bound function.
    pub fn arguments(&self) -> &[NetworkType] {
        &self.inner.arguments
    }

    pub(crate) fn shared_arguments(&self) -> Arc<[NetworkType]> {
        Arc::clone(&self.inner.arguments)
    }

    pub fn returns(&self) -> Option<&NetworkType> {
        self.inner.returns.as_ref()
    }

    pub fn flags(&self) -> Flags {
        self.inner.flags
    }

    pub fn has_flag(&self, flag: Flags) -> bool {
        self.inner.flags.contains(flag)
    }

    pub fn reliability(&self) -> Reliability {
        self.inner.reliability
    }

    /// How long a call waits for its response. `None` for events and
    /// broadcasts.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Whether the first argument is the id of the object the call targets.
    pub fn is_identity_bound(&self) -> bool {
        self.inner.identity_bound
    }

    pub fn callback_middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.inner.callback_middleware
    }

    pub fn invoke_middleware(&self) -> &[Arc<dyn InvokeMiddleware>] {
        &self.inner.invoke_middleware
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments: Vec<_> = self.inner.arguments.iter().map(NetworkType::name).collect();
        f.debug_struct("Declaration")
            .field("kind", &self.inner.kind)
            .field("side", &self.inner.side)
            .field("arguments", &arguments)
            .field("returns", &self.inner.returns.as_ref().map(NetworkType::name))
            .field("flags", &self.inner.flags)
            .field("reliability", &self.inner.reliability)
            .field("timeout", &self.inner.timeout)
            .field("identity_bound", &self.inner.identity_bound)
            .field("callback_middleware", &self.inner.callback_middleware.len())
            .field("invoke_middleware", &self.inner.invoke_middleware.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder plumbing
// ---------------------------------------------------------------------------

/// Resolves a builder into declarations.
pub trait DeclarationBuilder {
    /// The sides this kind of remote exists on.
    fn sides(&self) -> &'static [Side] {
        &[Side::Server, Side::Client]
    }

    fn on_server(&self, config: &NetConfig) -> Result<Declaration, DefinitionError>;

    fn on_client(&self, config: &NetConfig) -> Result<Declaration, DefinitionError>;

    /// Resolves the declaration for `side`.
    fn on_side(&self, side: Side, config: &NetConfig) -> Result<Declaration, DefinitionError> {
        match side {
            Side::Server => self.on_server(config),
            Side::Client => self.on_client(config),
        }
    }
}

/// What every builder collects.
#[derive(Clone, Default)]
pub(crate) struct BuilderCore {
    pub(crate) arguments: Vec<NetworkType>,
    pub(crate) use_buffer: Option<bool>,
    pub(crate) debugging: Option<bool>,
    pub(crate) logging: Option<bool>,
    pub(crate) enforce_argument_count: Option<bool>,
    pub(crate) server_middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) client_middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) server_invoke_middleware: Vec<Arc<dyn InvokeMiddleware>>,
    pub(crate) client_invoke_middleware: Vec<Arc<dyn InvokeMiddleware>>,
}

/// Kind-specific parts of a declaration.
pub(crate) struct Resolved {
    pub(crate) kind: RemoteKind,
    pub(crate) side: Side,
    pub(crate) arguments: Vec<NetworkType>,
    pub(crate) returns: Option<NetworkType>,
    pub(crate) reliability: Reliability,
    pub(crate) timeout: Option<Duration>,
    pub(crate) identity_bound: bool,
}

impl BuilderCore {
    /// Layers the builder's overrides over `config`.
    fn flags(&self, config: &NetConfig) -> Flags {
        let mut flags = Flags::empty();
        flags.set(
            Flags::USE_BUFFER_SERIALIZATION,
            self.use_buffer.unwrap_or(config.use_buffers),
        );
        flags.set(
            Flags::ENFORCE_ARGUMENT_COUNT,
            self.enforce_argument_count
                .unwrap_or(config.enforce_argument_count),
        );
        flags.set(Flags::DEBUGGING, self.debugging.unwrap_or(config.debugging));
        flags.set(Flags::LOGGING, self.logging.unwrap_or(config.logging));
        flags
    }

    pub(crate) fn resolve(&self, config: &NetConfig, resolved: Resolved) -> Declaration {
        let mut flags = self.flags(config);
        if flags.contains(Flags::USE_BUFFER_SERIALIZATION) {
            let without_codec = resolved
                .arguments
                .iter()
                .chain(resolved.returns.as_ref())
                .find(|ty| !ty.has_codec());
            if let Some(ty) = without_codec {
                tracing::warn!(
                    ty = ty.name(),
                    kind = ?resolved.kind,
                    "type has no buffer codec, falling back to plain serialization"
                );
                flags.remove(Flags::USE_BUFFER_SERIALIZATION);
            }
        }

        let (callback_middleware, invoke_middleware) = match resolved.side {
            Side::Server => (
                self.server_middleware.clone(),
                self.server_invoke_middleware.clone(),
            ),
            Side::Client => (
                self.client_middleware.clone(),
                self.client_invoke_middleware.clone(),
            ),
        };

        Declaration {
            inner: Arc::new(Inner {
                kind: resolved.kind,
                side: resolved.side,
                arguments: resolved.arguments.into(),
                returns: resolved.returns,
                flags,
                reliability: resolved.reliability,
                timeout: resolved.timeout,
                identity_bound: resolved.identity_bound,
                callback_middleware,
                invoke_middleware,
            }),
        }
    }
}

/// Expands to the builder methods shared by every remote kind. The
/// builder must have a `core: BuilderCore` field.
macro_rules! common_builder_methods {
    () => {
        /// Appends one argument type.
        pub fn arg(mut self, ty: arcnet_types::NetworkType) -> Self {
            self.core.arguments.push(ty);
            self
        }

        /// Appends several argument types in order.
        pub fn args(mut self, types: impl IntoIterator<Item = arcnet_types::NetworkType>) -> Self {
            self.core.arguments.extend(types);
            self
        }

        /// Overrides the model's buffer serialization setting.
        pub fn use_buffer(mut self, on: bool) -> Self {
            self.core.use_buffer = Some(on);
            self
        }

        pub fn debugging(mut self, on: bool) -> Self {
            self.core.debugging = Some(on);
            self
        }

        pub fn logging(mut self, on: bool) -> Self {
            self.core.logging = Some(on);
            self
        }

        pub fn enforce_argument_count(mut self, on: bool) -> Self {
            self.core.enforce_argument_count = Some(on);
            self
        }

        /// Adds a receive-path link used by the server side.
        pub fn server_middleware(mut self, link: impl $crate::middleware::Middleware) -> Self {
            self.core.server_middleware.push(std::sync::Arc::new(link));
            self
        }

        /// Adds a receive-path link used by the client side.
        pub fn client_middleware(mut self, link: impl $crate::middleware::Middleware) -> Self {
            self.core.client_middleware.push(std::sync::Arc::new(link));
            self
        }

        /// Adds a send-path link used by the server side.
        pub fn server_invoke_middleware(
            mut self,
            link: impl $crate::middleware::InvokeMiddleware,
        ) -> Self {
            self.core
                .server_invoke_middleware
                .push(std::sync::Arc::new(link));
            self
        }

        /// Adds a send-path link used by the client side.
        pub fn client_invoke_middleware(
            mut self,
            link: impl $crate::middleware::InvokeMiddleware,
        ) -> Self {
            self.core
                .client_invoke_middleware
                .push(std::sync::Arc::new(link));
            self
        }
    };
}

pub(crate) use common_builder_methods;

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(side: Side, arguments: Vec<NetworkType>) -> Resolved {
        Resolved {
            kind: RemoteKind::Event,
            side,
            arguments,
            returns: None,
            reliability: Reliability::default(),
            timeout: None,
            identity_bound: false,
        }
    }

    #[test]
    fn test_overrides_layer_over_config() {
        let config = NetConfig::default().with_logging(true);
        let core = BuilderCore {
            logging: Some(false),
            debugging: Some(true),
            ..BuilderCore::default()
        };
        let decl = core.resolve(&config, resolved(Side::Server, vec![]));
        assert!(!decl.has_flag(Flags::LOGGING));
        assert!(decl.has_flag(Flags::DEBUGGING));
        assert!(decl.has_flag(Flags::ENFORCE_ARGUMENT_COUNT));
        assert!(!decl.has_flag(Flags::USE_BUFFER_SERIALIZATION));
    }

    #[test]
    fn test_buffer_mode_forced_off_without_codec() {
        let config = NetConfig::default().with_buffers(true);
        let core = BuilderCore::default();

        let with_codecs = core.resolve(&config, resolved(Side::Server, vec![NetworkType::string()]));
        assert!(with_codecs.has_flag(Flags::USE_BUFFER_SERIALIZATION));

        let with_player = core.resolve(
            &config,
            resolved(Side::Server, vec![NetworkType::string(), NetworkType::player()]),
        );
        assert!(!with_player.has_flag(Flags::USE_BUFFER_SERIALIZATION));
    }

    #[test]
    fn test_middleware_is_picked_per_side() {
        let core = BuilderCore {
            server_middleware: vec![Arc::new(crate::middleware::Filter::new(|_, _| true))],
            ..BuilderCore::default()
        };
        let config = NetConfig::default();
        assert_eq!(
            core.resolve(&config, resolved(Side::Server, vec![]))
                .callback_middleware()
                .len(),
            1
        );
        assert!(core
            .resolve(&config, resolved(Side::Client, vec![]))
            .callback_middleware()
            .is_empty());
    }

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Server.to_string(), "server");
        assert_eq!(Side::Client.to_string(), "client");
    }
}
