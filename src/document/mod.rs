// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Document State Machine.

pub mod batch;
pub mod collection;
pub mod query;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::schema::{SYSTEM_ID, SYSTEM_OWNER_ID, SYSTEM_REVISION};
use crate::error::{KernelError, Result};
use crate::types::{Identifier, Revision};

pub use batch::{BatchResult, DocumentCreate, DocumentDelete, DocumentReplace, DocumentsBatch};
pub use collection::{DocumentCollection, DocumentStore};
pub use query::{DocumentQuery, WhereClause, WhereOperator};

/// Field values of a document, keyed by property name.
pub type DocumentData = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: Identifier,
    #[serde(rename = "$type")]
    pub document_type: String,
    #[serde(rename = "$dataContractId")]
    pub contract_id: Identifier,
    #[serde(rename = "$ownerId")]
    pub owner_id: Identifier,
    #[serde(rename = "$revision")]
    pub revision: Revision,
    #[serde(flatten)]
    pub data: DocumentData,
}

impl Document {
    /// Deterministic id from contract, type, owner and client entropy.
    pub fn generate_id(
        contract_id: &Identifier,
        owner_id: &Identifier,
        document_type: &str,
        entropy: &[u8; 32],
    ) -> Identifier {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"document");
        hasher.update(contract_id.as_bytes());
        hasher.update(owner_id.as_bytes());
        hasher.update(&(document_type.len() as u32).to_le_bytes());
        hasher.update(document_type.as_bytes());
        hasher.update(entropy);
        Identifier::from_hash(hasher.finalize())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| KernelError::Encoding(e.to_string()))
    }

    /// Value of a data or system field, as seen by indices and queries.
    pub fn field_value(&self, field: &str) -> Value {
        match field {
            SYSTEM_ID => Value::String(self.id.to_hex()),
            SYSTEM_OWNER_ID => Value::String(self.owner_id.to_hex()),
            SYSTEM_REVISION => Value::from(self.revision),
            other => self.data.get(other).cloned().unwrap_or(Value::Null),
        }
    }
}
