// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! State Transitions.
//!
//! Every mutation of platform state is expressed as a `StateTransition`.
//! Transitions are serialized as JSON on the wire; the transition hash is the
//! BLAKE3 of that encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::asset_lock::AssetLockProof;
use crate::contract::DocumentSchema;
use crate::document::DocumentsBatch;
use crate::error::{KernelError, Result};
use crate::identity::IdentityPublicKey;
use crate::types::{Identifier, KeyId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    IdentityCreate,
    IdentityTopUp,
    DataContractCreate,
    DocumentsBatch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateTransition {
    #[serde(rename_all = "camelCase")]
    IdentityCreate {
        asset_lock_proof: AssetLockProof,
        public_keys: Vec<IdentityPublicKey>,
        /// Signature by the asset-lock key. Verified by the host.
        signature: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    IdentityTopUp {
        identity_id: Identifier,
        asset_lock_proof: AssetLockProof,
        signature: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    DataContractCreate {
        owner_id: Identifier,
        document_schemas: BTreeMap<String, DocumentSchema>,
        signature_public_key_id: KeyId,
        signature: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    DocumentsBatch {
        owner_id: Identifier,
        contract_id: Identifier,
        batch: DocumentsBatch,
        signature_public_key_id: KeyId,
        signature: Vec<u8>,
    },
}

impl StateTransition {
    pub fn kind(&self) -> TransitionKind {
        match self {
            StateTransition::IdentityCreate { .. } => TransitionKind::IdentityCreate,
            StateTransition::IdentityTopUp { .. } => TransitionKind::IdentityTopUp,
            StateTransition::DataContractCreate { .. } => TransitionKind::DataContractCreate,
            StateTransition::DocumentsBatch { .. } => TransitionKind::DocumentsBatch,
        }
    }

    /// Identity that signs the transition, if it already exists.
    pub fn owner_id(&self) -> Option<Identifier> {
        match self {
            StateTransition::IdentityCreate { .. } => None,
            StateTransition::IdentityTopUp { identity_id, .. } => Some(*identity_id),
            StateTransition::DataContractCreate { owner_id, .. }
            | StateTransition::DocumentsBatch { owner_id, .. } => Some(*owner_id),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| KernelError::Encoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| KernelError::Encoding(e.to_string()))
    }

    pub fn hash(&self) -> Result<[u8; 32]> {
        Ok(blake3::hash(&self.to_bytes()?).into())
    }
}
