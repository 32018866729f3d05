// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::BTreeMap;

use serde_json::{json, Value};

use platform_kernel::contract::{DocumentSchema, IndexDefinition, PropertySchema, PropertyType, StringFormat};
use platform_kernel::document::{DocumentData, DocumentDelete, DocumentQuery, DocumentReplace, DocumentsBatch, WhereClause};
use platform_kernel::identity::{IdentityPublicKey, KeyType};
use platform_node::telemetry::{init_telemetry, render_metrics};
use platform_node::{LocalNetwork, NodeConfig, NodeError, PlatformClient};

const BOB_WALLET: &str = "yBobWallet";
const ALICE_WALLET: &str = "yAliceWallet";

fn contacts_schemas() -> BTreeMap<String, DocumentSchema> {
    BTreeMap::from([
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
        (
            "contact".to_string(),
            DocumentSchema::new(BTreeMap::from([
                ("toUserId".to_string(), PropertySchema::string()),
                ("publicKey".to_string(), PropertySchema::string()),
            ]))
            .require(&["toUserId", "publicKey"])
            .with_index(IndexDefinition::unique(&["$ownerId", "toUserId"])),
        ),
    ])
}

fn signing_key(seed: u8) -> IdentityPublicKey {
    let mut key_data = vec![seed; 33];
    key_data[0] = 0x02;
    IdentityPublicKey::new(0, KeyType::EcdsaSecp256k1, key_data)
}

fn fields(value: Value) -> DocumentData {
    match value {
        Value::Object(map) => map,
        _ => DocumentData::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    init_telemetry();

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Starting local platform with config: {:?}", cfg);

    let network = LocalNetwork::new(&cfg);
    let bob_client = PlatformClient::new(network.chain.clone(), network.platform.clone(), cfg.clone(), BOB_WALLET);
    let alice_client = PlatformClient::new(network.chain.clone(), network.platform.clone(), cfg, ALICE_WALLET);

    network.chain.fund_address(BOB_WALLET, 40_000);
    let balance = bob_client.wait_for_balance(40_000).await?;
    tracing::info!(balance, "wallet funded");

    let bob = bob_client.register_identity(vec![signing_key(0x5a)]).await?;
    let alice = alice_client.register_identity(vec![signing_key(0xa5)]).await?;
    let contract = bob_client.publish_contract(&bob, contacts_schemas()).await?;

    // Profiles
    let bob_profile = bob_client.document_create(
        "profile",
        fields(json!({ "displayName": "Bob", "avatarUrl": "https://example.com/bob.png" })),
    );
    bob_client.broadcast_documents(&bob, &contract.id, DocumentsBatch::new().create(bob_profile)).await?;

    let alice_profile = alice_client.document_create("profile", fields(json!({ "displayName": "Alice" })));
    let created = alice_client
        .broadcast_documents(&alice, &contract.id, DocumentsBatch::new().create(alice_profile))
        .await?;
    for doc in &created {
        let updated = fields(json!({ "displayName": "Alice", "avatarUrl": "https://example.com/alice.png" }));
        let replaced = alice_client
            .broadcast_documents(&alice, &contract.id, DocumentsBatch::new().replace(DocumentReplace::of(doc, updated)))
            .await?;
        tracing::info!(document = %doc.id, revisions = ?replaced.iter().map(|d| d.revision).collect::<Vec<_>>(), "profile updated");
    }

    // Bob sends a contact request, Alice approves it.
    let request = bob_client.document_create(
        "contact",
        fields(json!({ "toUserId": alice.id.to_hex(), "publicKey": "A1B2C3" })),
    );
    bob_client.broadcast_documents(&bob, &contract.id, DocumentsBatch::new().create(request)).await?;

    let to_alice = DocumentQuery::all().filter(WhereClause::eq("toUserId", alice.id.to_hex()));
    let incoming = alice_client.get_documents(&contract.id, "contact", to_alice).await?;
    tracing::info!(count = incoming.len(), "contact requests for alice");

    let approval = alice_client.document_create(
        "contact",
        fields(json!({ "toUserId": bob.id.to_hex(), "publicKey": "D4E5F6" })),
    );
    let approvals = alice_client
        .broadcast_documents(&alice, &contract.id, DocumentsBatch::new().create(approval))
        .await?;

    // Alice withdraws the approval.
    let mut withdraw = DocumentsBatch::new();
    for doc in &approvals {
        withdraw = withdraw.delete(DocumentDelete::of(doc));
    }
    if !withdraw.is_empty() {
        alice_client.broadcast_documents(&alice, &contract.id, withdraw).await?;
    }

    for id in [bob.id, alice.id] {
        if let Some(identity) = bob_client.get_identity(&id).await? {
            tracing::info!(identity = %identity.id, balance = identity.balance, revision = identity.revision, "final identity");
        }
    }
    tracing::info!(state = %hex_digest(&network.platform.state_hash().await), "platform state hash");
    println!("{}", render_metrics());
    Ok(())
}

fn hex_digest(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
