// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity Ledger.
//!
//! Owns every identity, the global public-key hash index and the set of
//! consumed asset-lock out-points. All three are updated together: a
//! create either lands in all of them or in none.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::asset_lock::{AssetLockProof, CoreChainView, LockedOutput};
use crate::config::{CREDITS_PER_DUFF, MAX_PUBLIC_KEYS};
use crate::error::{KernelError, Result};
use crate::types::{Credits, Identifier, KeyId, OutPoint, PublicKeyHash, Revision};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyType {
    EcdsaSecp256k1 = 0,
    Bls12_381 = 1,
    EcdsaHash160 = 2,
}

impl KeyType {
    /// Expected encoded key length.
    pub fn data_len(&self) -> usize {
        match self {
            KeyType::EcdsaSecp256k1 => 33,
            KeyType::Bls12_381 => 48,
            KeyType::EcdsaHash160 => 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPublicKey {
    pub id: KeyId,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub data: Vec<u8>,
}

impl IdentityPublicKey {
    pub fn new(id: u32, key_type: KeyType, data: Vec<u8>) -> Self {
        Self { id: KeyId(id), key_type, data }
    }

    pub fn hash(&self) -> PublicKeyHash {
        let mut out = [0u8; 20];
        match self.key_type {
            // Already a hash.
            KeyType::EcdsaHash160 if self.data.len() == 20 => out.copy_from_slice(&self.data),
            _ => out.copy_from_slice(&blake3::hash(&self.data).as_bytes()[..20]),
        }
        PublicKeyHash(out)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Identifier,
    pub public_keys: Vec<IdentityPublicKey>,
    pub balance: Credits,
    pub revision: Revision,
}

impl Identity {
    /// Identity id committed to by an asset-lock out-point.
    pub fn id_from_out_point(out_point: &OutPoint) -> Identifier {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"identity");
        hasher.update(&out_point.to_bytes());
        Identifier::from_hash(hasher.finalize())
    }

    pub fn public_key(&self, id: KeyId) -> Option<&IdentityPublicKey> {
        self.public_keys.iter().find(|k| k.id == id)
    }

    /// JSON projection without the balance, stable across top-ups and debits.
    pub fn to_json_without_balance(&self) -> Value {
        json!({
            "id": self.id.to_hex(),
            "publicKeys": self.public_keys.iter().map(|k| json!({
                "id": k.id.0,
                "type": k.key_type as u8,
                "data": hex::encode(&k.data),
            })).collect::<Vec<_>>(),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct IdentityLedger {
    identities: FxHashMap<Identifier, Identity>,
    key_index: FxHashMap<PublicKeyHash, Identifier>,
    consumed: FxHashSet<OutPoint>,
}

impl IdentityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Read APIs ---

    pub fn get(&self, id: &Identifier) -> Option<&Identity> {
        self.identities.get(id)
    }

    pub fn get_by_public_key_hash(&self, hash: &PublicKeyHash) -> Option<&Identity> {
        self.key_index.get(hash).and_then(|id| self.identities.get(id))
    }

    pub fn get_id_by_public_key_hash(&self, hash: &PublicKeyHash) -> Option<Identifier> {
        self.key_index.get(hash).copied()
    }

    pub fn balance(&self, id: &Identifier) -> Result<Credits> {
        self.identities
            .get(id)
            .map(|i| i.balance)
            .ok_or(KernelError::IdentityNotFound(*id))
    }

    pub fn is_consumed(&self, out_point: &OutPoint) -> bool {
        self.consumed.contains(out_point)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.values()
    }

    pub(crate) fn consumed_out_points(&self) -> impl Iterator<Item = &OutPoint> {
        self.consumed.iter()
    }

    // --- Write Logic ---

    pub fn create_identity(
        &mut self,
        proof: &AssetLockProof,
        public_keys: Vec<IdentityPublicKey>,
        core: &impl CoreChainView,
    ) -> Result<Identity> {
        let locked = self.redeemable(proof, core)?;
        self.validate_new_keys(&public_keys)?;

        let id = Identity::id_from_out_point(&locked.out_point);
        if self.identities.contains_key(&id) {
            // Ids are derived from out-points, so this is the same lock again.
            return Err(KernelError::DuplicateAssetLock {
                tx_id: locked.out_point.tx_id,
                output_index: locked.out_point.output_index,
            });
        }

        let identity = Identity {
            id,
            public_keys,
            balance: locked.value.saturating_mul(CREDITS_PER_DUFF),
            revision: 0,
        };

        // Validation complete: commit to every structure together.
        for key in &identity.public_keys {
            self.key_index.insert(key.hash(), id);
        }
        self.consumed.insert(locked.out_point);
        self.identities.insert(id, identity.clone());

        tracing::debug!(identity = %id, balance = identity.balance, "identity created");
        Ok(identity)
    }

    pub fn top_up(&mut self, identity_id: &Identifier, proof: &AssetLockProof, core: &impl CoreChainView) -> Result<Credits> {
        if !self.identities.contains_key(identity_id) {
            return Err(KernelError::IdentityNotFound(*identity_id));
        }
        let locked = self.redeemable(proof, core)?;
        let credits = locked.value.saturating_mul(CREDITS_PER_DUFF);

        self.consumed.insert(locked.out_point);
        let identity = self
            .identities
            .get_mut(identity_id)
            .ok_or(KernelError::IdentityNotFound(*identity_id))?;
        identity.balance = identity.balance.saturating_add(credits);
        identity.revision += 1;

        tracing::debug!(identity = %identity_id, credits, balance = identity.balance, "identity topped up");
        Ok(identity.balance)
    }

    /// Fails without mutation when the balance cannot cover `amount`.
    pub fn ensure_balance(&self, identity_id: &Identifier, amount: Credits) -> Result<()> {
        let available = self.balance(identity_id)?;
        if amount > available {
            return Err(KernelError::InsufficientCredits { required: amount, available });
        }
        Ok(())
    }

    /// Atomic check-and-subtract.
    pub fn debit(&mut self, identity_id: &Identifier, amount: Credits) -> Result<Credits> {
        let identity = self
            .identities
            .get_mut(identity_id)
            .ok_or(KernelError::IdentityNotFound(*identity_id))?;
        if amount > identity.balance {
            return Err(KernelError::InsufficientCredits {
                required: amount,
                available: identity.balance,
            });
        }
        identity.balance -= amount;
        identity.revision += 1;
        Ok(identity.balance)
    }

    fn redeemable(&self, proof: &AssetLockProof, core: &impl CoreChainView) -> Result<LockedOutput> {
        let locked = proof.resolve(core)?;
        if self.consumed.contains(&locked.out_point) {
            return Err(KernelError::DuplicateAssetLock {
                tx_id: locked.out_point.tx_id,
                output_index: locked.out_point.output_index,
            });
        }
        Ok(locked)
    }

    fn validate_new_keys(&self, keys: &[IdentityPublicKey]) -> Result<()> {
        if keys.is_empty() {
            return Err(KernelError::InvalidPublicKeys("at least one public key is required".into()));
        }
        if keys.len() > MAX_PUBLIC_KEYS {
            return Err(KernelError::InvalidPublicKeys(format!(
                "{} keys exceed the maximum of {}",
                keys.len(),
                MAX_PUBLIC_KEYS
            )));
        }

        let mut ids = FxHashSet::default();
        let mut hashes = FxHashSet::default();
        for key in keys {
            if key.data.len() != key.key_type.data_len() {
                return Err(KernelError::InvalidPublicKeys(format!(
                    "key {} has {} bytes, expected {}",
                    key.id.0,
                    key.data.len(),
                    key.key_type.data_len()
                )));
            }
            if !ids.insert(key.id) {
                return Err(KernelError::DuplicatePublicKeyId(key.id));
            }
            let hash = key.hash();
            if !hashes.insert(hash) {
                return Err(KernelError::InvalidPublicKeys(format!("key {} is listed twice", key.id.0)));
            }
            if self.key_index.contains_key(&hash) {
                return Err(KernelError::PublicKeyAlreadyExists { public_key_hash: hash });
            }
        }
        Ok(())
    }
}
