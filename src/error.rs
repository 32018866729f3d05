// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::types::{Credits, Identifier, KeyId, PublicKeyHash, Revision, TxId};

/// Coarse classification used by callers to decide how to react.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Asset-lock preconditions. Never retried.
    Proof,
    /// Identity ledger failures. No partial state change.
    Ledger,
    /// Contract or document validation. Rejects the whole transition.
    Validation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("asset lock output {tx_id}:{output_index} cannot be resolved")]
    AssetLockTransactionNotFound { tx_id: TxId, output_index: u32 },

    #[error("asset lock output {tx_id}:{output_index} was already redeemed")]
    DuplicateAssetLock { tx_id: TxId, output_index: u32 },

    #[error("identity {0} not found")]
    IdentityNotFound(Identifier),

    #[error("public key {public_key_hash} is already bound to another identity")]
    PublicKeyAlreadyExists { public_key_hash: PublicKeyHash },

    #[error("public key id {0:?} is used more than once")]
    DuplicatePublicKeyId(KeyId),

    #[error("invalid identity public keys: {0}")]
    InvalidPublicKeys(String),

    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: Credits, available: Credits },

    #[error("signature key {key_id:?} does not belong to identity {identity_id}")]
    InvalidSignaturePublicKey { identity_id: Identifier, key_id: KeyId },

    #[error("data contract {0} not found")]
    DataContractNotFound(Identifier),

    #[error("invalid data contract: {0}")]
    InvalidDataContract(String),

    #[error("document type {0:?} is not defined by the contract")]
    UnknownDocumentType(String),

    #[error("document of type {document_type:?} failed schema validation: {reason}")]
    SchemaValidation { document_type: String, reason: String },

    #[error("unique index {index} of {document_type:?} already holds document {conflicting_id}")]
    UniqueIndexViolation {
        document_type: String,
        index: String,
        conflicting_id: Identifier,
    },

    #[error("identity {identity_id} is not the owner of document {document_id}")]
    NotAuthorized { identity_id: Identifier, document_id: Identifier },

    #[error("document {0} not found")]
    DocumentNotFound(Identifier),

    #[error("document {0} already exists")]
    DocumentAlreadyExists(Identifier),

    #[error("document {document_id} revision conflict: expected {expected}, stored {actual}")]
    RevisionConflict {
        document_id: Identifier,
        expected: Revision,
        actual: Revision,
    },

    #[error("documents batch is empty")]
    EmptyBatch,

    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl KernelError {
    pub fn class(&self) -> ErrorClass {
        match self {
            KernelError::AssetLockTransactionNotFound { .. } | KernelError::DuplicateAssetLock { .. } => {
                ErrorClass::Proof
            }
            KernelError::IdentityNotFound(_)
            | KernelError::PublicKeyAlreadyExists { .. }
            | KernelError::DuplicatePublicKeyId(_)
            | KernelError::InvalidPublicKeys(_)
            | KernelError::InsufficientCredits { .. }
            | KernelError::InvalidSignaturePublicKey { .. } => ErrorClass::Ledger,
            _ => ErrorClass::Validation,
        }
    }

    /// Stable consensus error name exposed across the broadcaster boundary.
    pub fn consensus_name(&self) -> &'static str {
        match self {
            KernelError::AssetLockTransactionNotFound { .. } => "IdentityAssetLockTransactionNotFoundError",
            KernelError::DuplicateAssetLock { .. } => "IdentityAssetLockTransactionOutPointAlreadyExistsError",
            KernelError::IdentityNotFound(_) => "IdentityNotFoundError",
            KernelError::PublicKeyAlreadyExists { .. } => "IdentityPublicKeyAlreadyExistsError",
            KernelError::DuplicatePublicKeyId(_) => "DuplicatedIdentityPublicKeyIdError",
            KernelError::InvalidPublicKeys(_) => "InvalidIdentityPublicKeyDataError",
            KernelError::InsufficientCredits { .. } => "BalanceIsNotEnoughError",
            KernelError::InvalidSignaturePublicKey { .. } => "InvalidSignaturePublicKeyError",
            KernelError::DataContractNotFound(_) => "DataContractNotPresentError",
            KernelError::InvalidDataContract(_) => "InvalidDataContractError",
            KernelError::UnknownDocumentType(_) => "InvalidDocumentTypeError",
            KernelError::SchemaValidation { .. } => "JsonSchemaError",
            KernelError::UniqueIndexViolation { .. } => "DuplicateUniqueIndexError",
            KernelError::NotAuthorized { .. } => "DocumentOwnerIdMismatchError",
            KernelError::DocumentNotFound(_) => "DocumentNotFoundError",
            KernelError::DocumentAlreadyExists(_) => "DocumentAlreadyPresentError",
            KernelError::RevisionConflict { .. } => "InvalidDocumentRevisionError",
            KernelError::EmptyBatch => "InvalidDocumentTransitionError",
            KernelError::Encoding(_) => "SerializationError",
        }
    }

    /// Structured fields attached to the consensus error.
    pub fn extra(&self) -> Map<String, Value> {
        let value = match self {
            KernelError::AssetLockTransactionNotFound { tx_id, output_index }
            | KernelError::DuplicateAssetLock { tx_id, output_index } => json!({
                "transactionId": tx_id.to_string(),
                "outputIndex": output_index,
            }),
            KernelError::IdentityNotFound(id) => json!({ "identityId": id.to_hex() }),
            KernelError::PublicKeyAlreadyExists { public_key_hash } => json!({
                "publicKeyHash": public_key_hash.to_string(),
            }),
            KernelError::InsufficientCredits { required, available } => json!({
                "requiredBalance": required,
                "balance": available,
            }),
            KernelError::UniqueIndexViolation { document_type, index, conflicting_id } => json!({
                "documentType": document_type,
                "index": index,
                "conflictingDocumentId": conflicting_id.to_hex(),
            }),
            KernelError::RevisionConflict { document_id, expected, actual } => json!({
                "documentId": document_id.to_hex(),
                "expectedRevision": expected,
                "currentRevision": actual,
            }),
            _ => json!({}),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
pub type Result<T> = KernelResult<T>;
