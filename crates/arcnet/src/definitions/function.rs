use std::time::Duration;

use arcnet_protocol::Reliability;
use arcnet_types::NetworkType;

use super::{BuilderCore, Declaration, DeclarationBuilder, RemoteKind, Resolved, Side, common_builder_methods};
use crate::config::NetConfig;
use crate::error::DefinitionError;

/// How long a function call waits for its response unless the builder
/// says otherwise.
pub const DEFAULT_FUNCTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a request/response remote.
#[derive(Clone)]
pub struct FunctionBuilder {
    core: BuilderCore,
    returns: Option<NetworkType>,
    timeout: Duration,
    identity_bound: bool,
}

impl Default for FunctionBuilder {
    fn default() -> Self {
        Self {
            core: BuilderCore::default(),
            returns: None,
            timeout: DEFAULT_FUNCTION_TIMEOUT,
            identity_bound: false,
        }
    }
}

impl FunctionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    common_builder_methods!();

    /// The type responses are validated against. Without one, any value
    /// is accepted.
    pub fn returns(mut self, ty: NetworkType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prepends an object id argument. Live functions then hand out
    /// per-object handles via `bind`.
    pub fn bind_to_object(mut self) -> Self {
        self.identity_bound = true;
        self
    }

    fn resolve(&self, side: Side, config: &NetConfig) -> Result<Declaration, DefinitionError> {
        if self.timeout.is_zero() {
            return Err(DefinitionError::ZeroTimeout);
        }
        let mut arguments = Vec::with_capacity(self.core.arguments.len() + 1);
        if self.identity_bound {
            arguments.push(NetworkType::object());
        }
        arguments.extend(self.core.arguments.iter().cloned());

        Ok(self.core.resolve(
            config,
            Resolved {
                kind: RemoteKind::Function,
                side,
                arguments,
                returns: self.returns.clone(),
                reliability: Reliability::ReliableOrdered,
                timeout: Some(self.timeout),
                identity_bound: self.identity_bound,
            },
        ))
    }
}

impl DeclarationBuilder for FunctionBuilder {
    fn on_server(&self, config: &NetConfig) -> Result<Declaration, DefinitionError> {
        self.resolve(Side::Server, config)
    }

    fn on_client(&self, config: &NetConfig) -> Result<Declaration, DefinitionError> {
        self.resolve(Side::Client, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;

    #[test]
    fn test_default_timeout() {
        let decl = FunctionBuilder::new().on_server(&NetConfig::default()).unwrap();
        assert_eq!(decl.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(decl.kind(), RemoteKind::Function);
        assert!(decl.returns().is_none());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let builder = FunctionBuilder::new().timeout(Duration::ZERO);
        assert_eq!(
            builder.on_client(&NetConfig::default()).unwrap_err(),
            DefinitionError::ZeroTimeout
        );
    }

    #[test]
    fn test_bind_to_object_prepends_object_argument() {
        let decl = FunctionBuilder::new()
            .arg(NetworkType::string())
            .bind_to_object()
            .on_server(&NetConfig::default())
            .unwrap();
        assert!(decl.is_identity_bound());
        let names: Vec<_> = decl.arguments().iter().map(NetworkType::name).collect();
        assert_eq!(names, vec!["Object", "string"]);
    }

    #[test]
    fn test_return_type_without_codec_disables_buffers() {
        let decl = FunctionBuilder::new()
            .arg(NetworkType::string())
            .returns(NetworkType::unknown())
            .use_buffer(true)
            .on_server(&NetConfig::default())
            .unwrap();
        assert!(!decl.has_flag(Flags::USE_BUFFER_SERIALIZATION));
    }
}
