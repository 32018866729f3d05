// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use platform_kernel::contract::{DataContract, DocumentSchema, IndexDefinition, PropertySchema, PropertyType, StringFormat};
use platform_kernel::document::DocumentData;
use platform_kernel::identity::{Identity, IdentityPublicKey, KeyType};
use platform_node::local::{LocalChain, LocalPlatform};
use platform_node::{LocalNetwork, NodeConfig, NodeError, PlatformClient};

pub const WALLET: &str = "yTestWallet";

pub type Client = PlatformClient<Arc<LocalChain>, LocalPlatform>;

pub fn setup() -> (LocalNetwork, Client) {
    setup_with(NodeConfig::default())
}

pub fn setup_with(cfg: NodeConfig) -> (LocalNetwork, Client) {
    let network = LocalNetwork::new(&cfg);
    let client = PlatformClient::new(network.chain.clone(), network.platform.clone(), cfg, WALLET);
    (network, client)
}

pub fn key(id: u32, seed: u8) -> IdentityPublicKey {
    let mut data = vec![seed; 33];
    data[0] = 0x02;
    IdentityPublicKey::new(id, KeyType::EcdsaSecp256k1, data)
}

pub fn data(value: Value) -> DocumentData {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn contact(to_user: &str) -> DocumentData {
    data(json!({ "toUserId": to_user, "publicKey": "A1B2C3" }))
}

pub fn contacts_schemas() -> BTreeMap<String, DocumentSchema> {
    BTreeMap::from([
        (
            "contact".to_string(),
            DocumentSchema::new(BTreeMap::from([
                ("toUserId".to_string(), PropertySchema::string()),
                ("publicKey".to_string(), PropertySchema::string()),
            ]))
            .require(&["toUserId", "publicKey"])
            .with_index(IndexDefinition::unique(&["$ownerId", "toUserId"])),
        ),
        (
            "note".to_string(),
            DocumentSchema::new(BTreeMap::from([("message".to_string(), PropertySchema::string())])),
        ),
        (
            "profile".to_string(),
            DocumentSchema::new(BTreeMap::from([
                ("displayName".to_string(), PropertySchema::string().with_max_length(16)),
                ("avatarUrl".to_string(), PropertySchema::string().with_format(StringFormat::Url)),
                (
                    "age".to_string(),
                    PropertySchema { minimum: Some(0), maximum: Some(150), ..PropertySchema::of(PropertyType::Integer) },
                ),
            ]))
            .require(&["displayName"])
            .closed(),
        ),
    ])
}

/// Second client on the same network with its own wallet.
pub fn client_for(network: &LocalNetwork, wallet: &str) -> Client {
    PlatformClient::new(network.chain.clone(), network.platform.clone(), NodeConfig::default(), wallet)
}

/// Registered identity plus the contacts contract it owns.
pub async fn contacts_app(client: &Client, seed: u8) -> (Identity, DataContract) {
    let owner = client.register_identity(vec![key(0, seed)]).await.unwrap();
    let contract = client.publish_contract(&owner, contacts_schemas()).await.unwrap();
    (owner, contract)
}

pub fn remote_code(err: &NodeError) -> u32 {
    err.remote_validation().map(|e| e.code).unwrap_or_else(|| panic!("not a remote rejection: {err}"))
}
