use arcnet_protocol::Reliability;

use super::{BuilderCore, Declaration, DeclarationBuilder, RemoteKind, Resolved, Side, common_builder_methods};
use crate::config::NetConfig;
use crate::error::DefinitionError;

/// Builds a fire-and-forget event usable in both directions.
#[derive(Clone, Default)]
pub struct EventBuilder {
    core: BuilderCore,
    reliability: Reliability,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    common_builder_methods!();

    /// Marks the event as droppable. Transports without an unreliable
    /// channel still deliver it reliably.
    pub fn unreliable(mut self) -> Self {
        self.reliability = Reliability::Unreliable;
        self
    }

    fn resolve(&self, side: Side, config: &NetConfig) -> Declaration {
        self.core.resolve(
            config,
            Resolved {
                kind: RemoteKind::Event,
                side,
                arguments: self.core.arguments.clone(),
                returns: None,
                reliability: self.reliability,
                timeout: None,
                identity_bound: false,
            },
        )
    }
}

impl DeclarationBuilder for EventBuilder {
    fn on_server(&self, config: &NetConfig) -> Result<Declaration, DefinitionError> {
        Ok(self.resolve(Side::Server, config))
    }

    fn on_client(&self, config: &NetConfig) -> Result<Declaration, DefinitionError> {
        Ok(self.resolve(Side::Client, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use arcnet_types::NetworkType;

    #[test]
    fn test_both_sides_are_independent() {
        let builder = EventBuilder::new()
            .arg(NetworkType::string())
            .use_buffer(true)
            .unreliable();
        let config = NetConfig::default();

        let server = builder.on_server(&config).unwrap();
        let client = builder.on_client(&config).unwrap();
        assert_eq!(server.side(), Side::Server);
        assert_eq!(client.side(), Side::Client);
        assert_eq!(server.kind(), RemoteKind::Event);
        assert_eq!(client.arguments().len(), 1);
        assert!(server.reliability().is_unreliable());
        assert!(client.has_flag(Flags::USE_BUFFER_SERIALIZATION));
        assert_eq!(server.timeout(), None);
    }

    #[test]
    fn test_default_reliability_is_ordered() {
        let decl = EventBuilder::new().on_server(&NetConfig::default()).unwrap();
        assert_eq!(decl.reliability(), Reliability::ReliableOrdered);
        assert!(decl.arguments().is_empty());
    }
}
