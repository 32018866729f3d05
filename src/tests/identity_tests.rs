// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::asset_lock::{AssetLockProof, NoCoreChain, StaticCoreChain};
use crate::config::CREDITS_PER_DUFF;
use crate::error::{ErrorClass, KernelError};
use crate::identity::{Identity, IdentityLedger, IdentityPublicKey, KeyType};
use crate::tests::fixtures::{funding_tx, instant_proof, key};
use crate::types::{Identifier, KeyId};

#[test]
fn test_create_identity_credits_locked_value() {
    let mut ledger = IdentityLedger::new();
    let proof = instant_proof(1, 10_000);

    let identity = ledger.create_identity(&proof, vec![key(0, 1)], &NoCoreChain).unwrap();

    assert_eq!(identity.balance, 10_000 * CREDITS_PER_DUFF);
    assert_eq!(identity.revision, 0);
    assert_eq!(identity.id, Identity::id_from_out_point(&proof.out_point()));
    assert_eq!(ledger.get(&identity.id), Some(&identity));
    assert!(ledger.is_consumed(&proof.out_point()));
}

#[test]
fn test_asset_lock_redeems_once() {
    let mut ledger = IdentityLedger::new();
    let proof = instant_proof(1, 10_000);
    let first = ledger.create_identity(&proof, vec![key(0, 1)], &NoCoreChain).unwrap();

    // Fresh keys do not make the same lock redeemable again.
    let err = ledger.create_identity(&proof, vec![key(0, 2)], &NoCoreChain).unwrap_err();
    assert!(matches!(err, KernelError::DuplicateAssetLock { .. }));
    assert_eq!(err.class(), ErrorClass::Proof);

    // Nor can it top up.
    let err = ledger.top_up(&first.id, &proof, &NoCoreChain).unwrap_err();
    assert!(matches!(err, KernelError::DuplicateAssetLock { .. }));

    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.balance(&first.id).unwrap(), 10_000 * CREDITS_PER_DUFF);
}

#[test]
fn test_public_key_is_globally_unique() {
    let mut ledger = IdentityLedger::new();
    let shared = key(0, 42);
    ledger.create_identity(&instant_proof(1, 10_000), vec![shared.clone()], &NoCoreChain).unwrap();

    let second_proof = instant_proof(2, 10_000);
    let err = ledger
        .create_identity(&second_proof, vec![key(0, 43), IdentityPublicKey { id: KeyId(1), ..shared.clone() }], &NoCoreChain)
        .unwrap_err();

    assert_eq!(err, KernelError::PublicKeyAlreadyExists { public_key_hash: shared.hash() });
    assert_eq!(err.consensus_name(), "IdentityPublicKeyAlreadyExistsError");
    assert_eq!(err.extra()["publicKeyHash"], shared.hash().to_string());

    // Failed create leaves nothing behind.
    assert_eq!(ledger.len(), 1);
    assert!(!ledger.is_consumed(&second_proof.out_point()));
    assert_eq!(ledger.get_id_by_public_key_hash(&key(0, 43).hash()), None);
}

#[test]
fn test_public_key_set_validation() {
    let mut ledger = IdentityLedger::new();

    let err = ledger.create_identity(&instant_proof(1, 1), vec![], &NoCoreChain).unwrap_err();
    assert!(matches!(err, KernelError::InvalidPublicKeys(_)));

    let err = ledger
        .create_identity(&instant_proof(1, 1), vec![key(0, 1), key(0, 2)], &NoCoreChain)
        .unwrap_err();
    assert_eq!(err, KernelError::DuplicatePublicKeyId(KeyId(0)));

    let short = IdentityPublicKey::new(0, KeyType::Bls12_381, vec![1; 33]);
    let err = ledger.create_identity(&instant_proof(1, 1), vec![short], &NoCoreChain).unwrap_err();
    assert!(matches!(err, KernelError::InvalidPublicKeys(_)));

    let hashed = IdentityPublicKey::new(0, KeyType::EcdsaHash160, vec![9; 20]);
    let identity = ledger.create_identity(&instant_proof(1, 1), vec![hashed.clone()], &NoCoreChain).unwrap();
    assert_eq!(hashed.hash().0, [9; 20]);
    assert_eq!(ledger.get_by_public_key_hash(&hashed.hash()).map(|i| i.id), Some(identity.id));
}

#[test]
fn test_top_up_adds_credits() {
    let mut ledger = IdentityLedger::new();
    let identity = ledger.create_identity(&instant_proof(1, 10_000), vec![key(0, 1)], &NoCoreChain).unwrap();

    let balance = ledger.top_up(&identity.id, &instant_proof(2, 500), &NoCoreChain).unwrap();

    assert_eq!(balance, 10_500 * CREDITS_PER_DUFF);
    assert_eq!(ledger.get(&identity.id).unwrap().revision, 1);
}

#[test]
fn test_top_up_with_chain_lock_proof() {
    let mut ledger = IdentityLedger::new();
    let identity = ledger.create_identity(&instant_proof(1, 10_000), vec![key(0, 1)], &NoCoreChain).unwrap();

    let mut core = StaticCoreChain::new();
    let txid = core.mine(&funding_tx(5, 2_000), 40);
    core.set_chain_locked_height(41);

    let balance = ledger.top_up(&identity.id, &AssetLockProof::chain(txid, 0, 41), &core).unwrap();
    assert_eq!(balance, 12_000 * CREDITS_PER_DUFF);
}

#[test]
fn test_top_up_unknown_identity() {
    let mut ledger = IdentityLedger::new();
    let proof = instant_proof(2, 500);
    let missing = Identifier([7; 32]);

    let err = ledger.top_up(&missing, &proof, &NoCoreChain).unwrap_err();
    assert_eq!(err, KernelError::IdentityNotFound(missing));
    // The lock stays redeemable.
    assert!(!ledger.is_consumed(&proof.out_point()));
}

#[test]
fn test_debit_never_goes_negative() {
    let mut ledger = IdentityLedger::new();
    let identity = ledger.create_identity(&instant_proof(1, 1), vec![key(0, 1)], &NoCoreChain).unwrap();
    let start = identity.balance;

    assert_eq!(ledger.debit(&identity.id, 400).unwrap(), start - 400);

    let err = ledger.debit(&identity.id, start).unwrap_err();
    assert_eq!(err, KernelError::InsufficientCredits { required: start, available: start - 400 });
    assert_eq!(ledger.balance(&identity.id).unwrap(), start - 400);

    assert_eq!(ledger.debit(&identity.id, start - 400).unwrap(), 0);
    assert!(ledger.ensure_balance(&identity.id, 0).is_ok());
    assert!(ledger.ensure_balance(&identity.id, 1).is_err());
}

#[test]
fn test_json_without_balance_is_stable() {
    let mut ledger = IdentityLedger::new();
    let identity = ledger.create_identity(&instant_proof(1, 10_000), vec![key(0, 1)], &NoCoreChain).unwrap();
    let before = identity.to_json_without_balance();

    ledger.top_up(&identity.id, &instant_proof(2, 10_000), &NoCoreChain).unwrap();
    ledger.debit(&identity.id, 1_000).unwrap();

    let after = ledger.get(&identity.id).unwrap().to_json_without_balance();
    assert_eq!(before, after);
    assert!(after.get("balance").is_none());
    assert_eq!(after["id"], identity.id.to_hex());
}
