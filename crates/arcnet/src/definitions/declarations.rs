use std::collections::BTreeMap;

use super::{Declaration, DeclarationBuilder, Side};
use crate::config::NetConfig;
use crate::error::DefinitionError;

/// The declarations for one name.
#[derive(Debug, Clone, Default)]
pub struct SideDeclarations {
    pub server: Option<Declaration>,
    pub client: Option<Declaration>,
}

impl SideDeclarations {
    pub fn get(&self, side: Side) -> Option<&Declaration> {
        match side {
            Side::Server => self.server.as_ref(),
            Side::Client => self.client.as_ref(),
        }
    }

    fn slot(&mut self, side: Side) -> &mut Option<Declaration> {
        match side {
            Side::Server => &mut self.server,
            Side::Client => &mut self.client,
        }
    }
}

/// Every declaration in a model, by name.
#[derive(Debug, Clone, Default)]
pub struct RemoteDeclarations {
    entries: BTreeMap<String, SideDeclarations>,
}

impl RemoteDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a model whose builders resolve against `config`.
    pub fn builder(config: NetConfig) -> RemoteDeclarationsBuilder {
        RemoteDeclarationsBuilder {
            config,
            declarations: Self::new(),
            error: None,
        }
    }

    /// Adds `declaration` under `name` on its side.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        declaration: Declaration,
    ) -> Result<(), DefinitionError> {
        let name = name.into();
        let side = declaration.side();
        let slot = self.entries.entry(name.clone()).or_default().slot(side);
        if slot.is_some() {
            return Err(DefinitionError::DuplicateName { name, side });
        }
        *slot = Some(declaration);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SideDeclarations> {
        self.entries.get(name)
    }

    /// Names with their declarations, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SideDeclarations)> {
        self.entries.iter().map(|(name, sides)| (name.as_str(), sides))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects builders into a [`RemoteDeclarations`].
///
/// The first failure is kept and returned by [`build`](Self::build); later
/// additions are ignored once one has failed.
pub struct RemoteDeclarationsBuilder {
    config: NetConfig,
    declarations: RemoteDeclarations,
    error: Option<DefinitionError>,
}

impl RemoteDeclarationsBuilder {
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Declares `name` on every side its kind exists on.
    pub fn add(self, name: &str, builder: impl DeclarationBuilder) -> Self {
        let sides = builder.sides();
        self.add_sides(name, sides, &builder)
    }

    /// Declares `name` on one side only.
    pub fn add_side(self, name: &str, side: Side, builder: impl DeclarationBuilder) -> Self {
        self.add_sides(name, &[side], &builder)
    }

    fn add_sides(mut self, name: &str, sides: &[Side], builder: &impl DeclarationBuilder) -> Self {
        if self.error.is_some() {
            return self;
        }
        for &side in sides {
            let result = builder
                .on_side(side, &self.config)
                .and_then(|decl| self.declarations.insert(name, decl));
            if let Err(e) = result {
                tracing::error!(remote = name, %side, error = %e, "invalid declaration");
                self.error = Some(e);
                break;
            }
        }
        self
    }

    pub fn build(self) -> Result<RemoteDeclarations, DefinitionError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.declarations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{BroadcastBuilder, EventBuilder, FunctionBuilder, RemoteKind};
    use std::time::Duration;

    #[test]
    fn test_events_and_functions_get_both_sides() {
        let model = RemoteDeclarations::builder(NetConfig::default())
            .add("Chat", EventBuilder::new())
            .add("GetScore", FunctionBuilder::new())
            .add("Shutdown", BroadcastBuilder::new())
            .build()
            .unwrap();

        let chat = model.get("Chat").unwrap();
        assert!(chat.server.is_some() && chat.client.is_some());
        let shutdown = model.get("Shutdown").unwrap();
        assert_eq!(shutdown.get(Side::Server).unwrap().kind(), RemoteKind::Broadcast);
        assert!(shutdown.client.is_none());

        let names: Vec<_> = model.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Chat", "GetScore", "Shutdown"]);
    }

    #[test]
    fn test_duplicate_side_is_rejected() {
        let err = RemoteDeclarations::builder(NetConfig::default())
            .add("Chat", EventBuilder::new())
            .add_side("Chat", Side::Client, EventBuilder::new())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DuplicateName {
                name: "Chat".into(),
                side: Side::Client,
            }
        );
    }

    #[test]
    fn test_first_error_wins() {
        let err = RemoteDeclarations::builder(NetConfig::default())
            .add("Slow", FunctionBuilder::new().timeout(Duration::ZERO))
            .add_side("Bad", Side::Client, BroadcastBuilder::new())
            .build()
            .unwrap_err();
        assert_eq!(err, DefinitionError::ZeroTimeout);
    }

    #[test]
    fn test_single_side_declaration() {
        let model = RemoteDeclarations::builder(NetConfig::default())
            .add_side("Notify", Side::Client, EventBuilder::new())
            .build()
            .unwrap();
        let notify = model.get("Notify").unwrap();
        assert!(notify.server.is_none());
        assert!(notify.client.is_some());
    }
}
