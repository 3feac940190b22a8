//! Registry lookups and their failure modes.

use std::sync::Arc;

use arcnet::prelude::*;
use arcnet::{
    ContextError, RemoteKind, Role, ServerRegistry, ServerRemote, Side,
};

fn declarations() -> RemoteDeclarations {
    RemoteDeclarations::builder(NetConfig::default())
        .add("Chat", EventBuilder::new().arg(NetworkType::string()))
        .add("GetScore", FunctionBuilder::new().returns(NetworkType::uint32()))
        .add_side("Notify", Side::Client, EventBuilder::new())
        .add_side("Kick", Side::Server, EventBuilder::new().arg(NetworkType::player()))
        .build()
        .unwrap()
}

fn with_broadcast() -> RemoteDeclarations {
    RemoteDeclarations::builder(NetConfig::default())
        .add("Chat", EventBuilder::new())
        .add("Shutdown", BroadcastBuilder::new().arg(NetworkType::string()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_lookups_are_built_once() {
    let network = MemoryNetwork::new();
    let registry = ServerRegistry::new(
        declarations(),
        Role::Server,
        ServerFactory::new(network.server()),
    );

    let first = registry.event("Chat").unwrap();
    let second = registry.event("Chat").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(matches!(registry.get("GetScore").unwrap(), ServerRemote::Function(_)));
    assert_eq!(registry.get("Kick").unwrap().kind(), RemoteKind::Event);
}

#[tokio::test]
async fn test_lookup_errors() {
    let network = MemoryNetwork::new();
    let registry = ServerRegistry::new(
        declarations(),
        Role::Server,
        ServerFactory::new(network.server()),
    );

    assert_eq!(
        registry.event("Missing").err().unwrap(),
        ContextError::UnknownRemote("Missing".into())
    );
    assert_eq!(
        registry.event("Notify").err().unwrap(),
        ContextError::ClientOnly("Notify".into())
    );
    assert_eq!(
        registry.event("GetScore").err().unwrap(),
        ContextError::WrongKind {
            name: "GetScore".into(),
            expected: RemoteKind::Event,
            found: RemoteKind::Function,
        }
    );
    assert!(matches!(
        registry.broadcast("Chat"),
        Err(ContextError::WrongKind { .. })
    ));
}

#[tokio::test]
async fn test_wrong_role_is_refused() {
    let network = MemoryNetwork::new();
    let registry = ServerRegistry::new(
        declarations(),
        Role::Client,
        ServerFactory::new(network.server()),
    );
    assert_eq!(registry.event("Chat").err().unwrap(), ContextError::NotServer);
    assert_eq!(registry.init().unwrap_err(), ContextError::NotServer);
}

#[tokio::test]
async fn test_model_sides() {
    let network = MemoryNetwork::new();
    let server = ContextModel::server(declarations(), ServerFactory::new(network.server()));
    let client = ContextModel::client(declarations(), ClientFactory::new(network.connect()));

    assert_eq!(server.role(), Role::Server);
    assert_eq!(server.get("Chat").server().unwrap().name(), "Chat");
    assert_eq!(server.get("Chat").client().err().unwrap(), ContextError::NotClient);
    assert_eq!(client.get("Chat").server().err().unwrap(), ContextError::NotServer);
    assert_eq!(client.get("Chat").client().unwrap().kind(), RemoteKind::Event);
    assert_eq!(
        client.get("Kick").client().err().unwrap(),
        ContextError::ServerOnly("Kick".into())
    );
}

#[tokio::test]
async fn test_broadcast_needs_messaging() {
    let network = MemoryNetwork::new();
    let server = ContextModel::server(with_broadcast(), ServerFactory::new(network.server()));
    assert_eq!(
        server.init().unwrap_err(),
        ContextError::MissingMessaging("Shutdown".into())
    );
    // The failed initialization is remembered.
    assert!(server.server_registry().unwrap().event("Chat").is_err());
}

#[tokio::test]
async fn test_broadcast_is_server_only() {
    let network = MemoryNetwork::new();
    let client = ContextModel::client(with_broadcast(), ClientFactory::new(network.connect()));
    assert_eq!(
        client.client_registry().unwrap().event("Shutdown").err().unwrap(),
        ContextError::ServerOnly("Shutdown".into())
    );
}
