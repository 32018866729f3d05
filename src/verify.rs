//! Deterministic Hashing and Verification.

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::state::platform::PlatformState;

/// Computes the cryptographic hash of the Platform State.
///
/// Covers the version, every identity (keys, balance, revision), every
/// consumed asset-lock out-point, every contract and every live or
/// tombstoned document. Hash-map backed structures are sorted first so the
/// result is independent of insertion order.
pub fn platform_state_hash(state: &PlatformState) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();

    // 1. Version
    hasher.update(&state.version.0.to_le_bytes());

    // 2. Identities (Canonical Order: By Id)
    let mut identities: Vec<_> = state.ledger.iter().collect();
    identities.sort_by_key(|i| i.id);
    for identity in identities {
        hasher.update(identity.id.as_bytes());
        hasher.update(&identity.balance.to_le_bytes());
        hasher.update(&identity.revision.to_le_bytes());
        hasher.update(&(identity.public_keys.len() as u32).to_le_bytes());
        for key in &identity.public_keys {
            hasher.update(&key.id.0.to_le_bytes());
            hasher.update(&[key.key_type as u8]);
            hasher.update(&key.hash().0);
        }
    }

    let mut consumed: Vec<_> = state.ledger.consumed_out_points().copied().collect();
    consumed.sort();
    for out_point in consumed {
        hasher.update(&out_point.to_bytes());
    }

    // 3. Contracts (Canonical Order: By Id; id commits to content)
    let mut contracts: Vec<_> = state.registry.iter().map(|c| c.id).collect();
    contracts.sort();
    for id in contracts {
        hasher.update(id.as_bytes());
    }

    // 4. Documents (Canonical Order: By Collection, then Id)
    for ((contract_id, document_type), collection) in state.documents.iter() {
        hasher.update(contract_id.as_bytes());
        hasher.update(document_type.as_bytes());
        for doc in collection.iter() {
            hasher.update(&[1]);
            hasher.update(doc.id.as_bytes());
            hasher.update(doc.owner_id.as_bytes());
            hasher.update(&doc.revision.to_le_bytes());
            hasher.update(&serde_json::to_vec(&doc.data).unwrap_or_default());
        }
        let mut tombstones: Vec<_> = collection.tombstones().copied().collect();
        tombstones.sort();
        for id in tombstones {
            hasher.update(&[0]);
            hasher.update(id.as_bytes());
        }
    }

    *hasher.finalize().as_bytes()
}
