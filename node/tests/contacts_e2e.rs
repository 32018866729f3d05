// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use serde_json::json;

use platform_kernel::document::{Document, DocumentDelete, DocumentQuery, DocumentReplace, DocumentsBatch, WhereClause};
use platform_node::errors::codes;

use common::{client_for, contact, contacts_app, data, key, remote_code, setup, WALLET};

#[tokio::test(start_paused = true)]
async fn test_contacts_lifecycle() {
    let (network, client) = setup();

    network.chain.fund_address(WALLET, 40_000);
    assert!(client.wait_for_balance(40_000).await.unwrap() >= 40_000);

    let (owner, contract) = contacts_app(&client, 1).await;

    // Create
    let batch = DocumentsBatch::new()
        .create(client.document_create("contact", contact("bob")))
        .create(client.document_create("contact", contact("carol")));
    let created = client.broadcast_documents(&owner, &contract.id, batch).await.unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|d| d.revision == 1 && d.owner_id == owner.id));

    let charged = client.get_identity(&owner.id).await.unwrap().unwrap();
    assert!(charged.balance < owner.balance);

    // Query
    let query = DocumentQuery::all().filter(WhereClause::eq("toUserId", "bob"));
    let bobs = client.get_documents(&contract.id, "contact", query.clone()).await.unwrap();
    assert_eq!(bobs.len(), 1);
    let bob = bobs[0].clone();
    assert_eq!(bob.data["publicKey"], "A1B2C3");

    // A second contact for the same user violates the unique index.
    let dup = DocumentsBatch::new().create(client.document_create("contact", contact("bob")));
    let err = client.broadcast_documents(&owner, &contract.id, dup).await.unwrap_err();
    assert_eq!(remote_code(&err), codes::INVALID_ARGUMENT);
    assert_eq!(err.consensus_name(), Some("DuplicateUniqueIndexError"));
    let after_reject = client.get_identity(&owner.id).await.unwrap().unwrap();
    assert_eq!(after_reject.balance, charged.balance);

    // Replace
    let mut rotated = bob.data.clone();
    rotated.insert("publicKey".to_string(), json!("D4E5F6"));
    let replaced = client
        .broadcast_documents(&owner, &contract.id, DocumentsBatch::new().replace(DocumentReplace::of(&bob, rotated)))
        .await
        .unwrap();
    assert_eq!(replaced[0].revision, 2);
    assert_eq!(replaced[0].data["publicKey"], "D4E5F6");

    // Delete
    let deleted = client
        .broadcast_documents(&owner, &contract.id, DocumentsBatch::new().delete(DocumentDelete::of(&replaced[0])))
        .await
        .unwrap();
    assert!(deleted.is_empty());
    assert_eq!(client.get_document(&contract.id, "contact", &bob.id).await.unwrap(), None);
    assert!(client.get_documents(&contract.id, "contact", query).await.unwrap().is_empty());

    // The unique slot is free again.
    let again = DocumentsBatch::new().create(client.document_create("contact", contact("bob")));
    let recreated = client.broadcast_documents(&owner, &contract.id, again).await.unwrap();
    assert_ne!(recreated[0].id, bob.id);
}

#[tokio::test(start_paused = true)]
async fn test_other_owner_cannot_touch_documents() {
    let (_network, client) = setup();
    let (owner, contract) = contacts_app(&client, 1).await;
    let intruder = client.register_identity(vec![key(0, 2)]).await.unwrap();

    let created = client
        .broadcast_documents(
            &owner,
            &contract.id,
            DocumentsBatch::new().create(client.document_create("contact", contact("bob"))),
        )
        .await
        .unwrap();

    let err = client
        .broadcast_documents(&intruder, &contract.id, DocumentsBatch::new().delete(DocumentDelete::of(&created[0])))
        .await
        .unwrap_err();
    assert_eq!(err.consensus_name(), Some("DocumentOwnerIdMismatchError"));

    // Uniqueness is scoped to the owner.
    let theirs = client
        .broadcast_documents(
            &intruder,
            &contract.id,
            DocumentsBatch::new().create(client.document_create("contact", contact("bob"))),
        )
        .await
        .unwrap();
    assert_eq!(theirs[0].owner_id, intruder.id);
}

#[tokio::test(start_paused = true)]
async fn test_two_user_contact_request_and_approval() {
    let (network, bob_client) = setup();
    let alice_client = client_for(&network, "yAliceWallet");

    let (bob, contract) = contacts_app(&bob_client, 1).await;
    let alice = alice_client.register_identity(vec![key(0, 2)]).await.unwrap();

    // Bob's profile
    let bob_profile = data(json!({ "displayName": "Bob", "avatarUrl": "https://example.com/bob.png", "age": 33 }));
    let created = bob_client
        .broadcast_documents(&bob, &contract.id, DocumentsBatch::new().create(bob_client.document_create("profile", bob_profile.clone())))
        .await
        .unwrap();
    let fetched = bob_client.get_document(&contract.id, "profile", &created[0].id).await.unwrap().unwrap();
    assert_eq!(fetched, created[0]);
    assert_eq!(fetched.data, bob_profile);
    assert_eq!(fetched.owner_id, bob.id);

    // Alice's profile, then an update
    let alice_profile = alice_client
        .broadcast_documents(
            &alice,
            &contract.id,
            DocumentsBatch::new().create(alice_client.document_create("profile", data(json!({ "displayName": "Alice" })))),
        )
        .await
        .unwrap()
        .remove(0);
    let updated = data(json!({ "displayName": "Alice", "avatarUrl": "https://example.com/alice.png" }));
    let alice_profile = alice_client
        .broadcast_documents(&alice, &contract.id, DocumentsBatch::new().replace(DocumentReplace::of(&alice_profile, updated.clone())))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(alice_profile.revision, 2);
    let fetched = alice_client.get_document(&contract.id, "profile", &alice_profile.id).await.unwrap().unwrap();
    assert_eq!(fetched.to_json().unwrap()["$revision"], 2);
    assert_eq!(fetched.data, updated);

    // Bob asks Alice
    let request = bob_client
        .broadcast_documents(
            &bob,
            &contract.id,
            DocumentsBatch::new().create(bob_client.document_create("contact", contact(&alice.id.to_hex()))),
        )
        .await
        .unwrap()
        .remove(0);

    let to_alice = DocumentQuery::all().filter(WhereClause::eq("toUserId", alice.id.to_hex()));
    let incoming = alice_client.get_documents(&contract.id, "contact", to_alice.clone()).await.unwrap();
    assert_eq!(incoming, vec![request.clone()]);
    assert_eq!(incoming[0].owner_id, bob.id);

    // Alice approves
    let approval = alice_client
        .broadcast_documents(
            &alice,
            &contract.id,
            DocumentsBatch::new().create(alice_client.document_create("contact", contact(&bob.id.to_hex()))),
        )
        .await
        .unwrap()
        .remove(0);
    assert_eq!(approval.owner_id, alice.id);
    let to_bob = DocumentQuery::all().filter(WhereClause::eq("toUserId", bob.id.to_hex()));
    assert_eq!(bob_client.get_documents(&contract.id, "contact", to_bob.clone()).await.unwrap(), vec![approval.clone()]);

    // Alice removes the approval; Bob's request stays.
    alice_client
        .broadcast_documents(&alice, &contract.id, DocumentsBatch::new().delete(DocumentDelete::of(&approval)))
        .await
        .unwrap();
    assert_eq!(alice_client.get_document(&contract.id, "contact", &approval.id).await.unwrap(), None);
    assert!(bob_client.get_documents(&contract.id, "contact", to_bob).await.unwrap().is_empty());
    assert_eq!(alice_client.get_documents(&contract.id, "contact", to_alice).await.unwrap(), vec![request]);
}

#[tokio::test(start_paused = true)]
async fn test_batch_creating_and_deleting_same_document_commits() {
    let (_network, client) = setup();
    let (owner, contract) = contacts_app(&client, 1).await;

    let op = client.document_create("contact", contact("bob"));
    let id = Document::generate_id(&contract.id, &owner.id, "contact", &op.entropy);
    let batch = DocumentsBatch::new()
        .create(op)
        .delete(DocumentDelete { id, document_type: "contact".to_string() });

    let committed = client.broadcast_documents(&owner, &contract.id, batch).await.unwrap();
    assert!(committed.is_empty());
    assert_eq!(client.get_document(&contract.id, "contact", &id).await.unwrap(), None);

    let charged = client.get_identity(&owner.id).await.unwrap().unwrap();
    assert!(charged.balance < owner.balance);

    // The unique slot never stayed taken.
    let again = DocumentsBatch::new().create(client.document_create("contact", contact("bob")));
    assert_eq!(client.broadcast_documents(&owner, &contract.id, again).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_batch_replacing_and_deleting_same_document_commits() {
    let (_network, client) = setup();
    let (owner, contract) = contacts_app(&client, 1).await;

    let doc = client
        .broadcast_documents(&owner, &contract.id, DocumentsBatch::new().create(client.document_create("contact", contact("bob"))))
        .await
        .unwrap()
        .remove(0);

    let batch = DocumentsBatch::new()
        .replace(DocumentReplace::of(&doc, contact("carol")))
        .delete(DocumentDelete::of(&doc));
    let committed = client.broadcast_documents(&owner, &contract.id, batch).await.unwrap();

    assert!(committed.is_empty());
    assert_eq!(client.get_document(&contract.id, "contact", &doc.id).await.unwrap(), None);
}
