use arcnet_protocol::Reliability;

use super::{BuilderCore, Declaration, DeclarationBuilder, RemoteKind, Resolved, Side, common_builder_methods};
use crate::config::NetConfig;
use crate::error::DefinitionError;

/// Builds a server-to-server message carried by the messaging service.
///
/// Broadcasts have no client side; `on_client` fails.
#[derive(Clone, Default)]
pub struct BroadcastBuilder {
    core: BuilderCore,
}

impl BroadcastBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    common_builder_methods!();
}

impl DeclarationBuilder for BroadcastBuilder {
    fn sides(&self) -> &'static [Side] {
        &[Side::Server]
    }

    fn on_server(&self, config: &NetConfig) -> Result<Declaration, DefinitionError> {
        Ok(self.core.resolve(
            config,
            Resolved {
                kind: RemoteKind::Broadcast,
                side: Side::Server,
                arguments: self.core.arguments.clone(),
                returns: None,
                reliability: Reliability::ReliableOrdered,
                timeout: None,
                identity_bound: false,
            },
        ))
    }

    fn on_client(&self, _config: &NetConfig) -> Result<Declaration, DefinitionError> {
        Err(DefinitionError::UnsupportedSide {
            kind: RemoteKind::Broadcast,
            side: Side::Client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcnet_types::NetworkType;

    #[test]
    fn test_server_only() {
        let builder = BroadcastBuilder::new().arg(NetworkType::string());
        let config = NetConfig::default();

        let decl = builder.on_server(&config).unwrap();
        assert_eq!(decl.kind(), RemoteKind::Broadcast);
        assert_eq!(builder.sides(), &[Side::Server]);
        assert!(matches!(
            builder.on_client(&config),
            Err(DefinitionError::UnsupportedSide { side: Side::Client, .. })
        ));
    }
}
