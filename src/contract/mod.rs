// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Data Contract Registry.
//!
//! Contracts are write-once. The id is derived from the canonical encoding of
//! `(owner_id, document_schemas)`, so re-submitting identical content finds the
//! existing entry instead of creating a second one.

pub mod schema;

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::types::Identifier;

pub use schema::{DocumentSchema, IndexDefinition, IndexProperty, PropertySchema, PropertyType, SortDirection, StringFormat};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContract {
    #[serde(rename = "$id")]
    pub id: Identifier,
    pub owner_id: Identifier,
    #[serde(rename = "documents")]
    pub document_schemas: BTreeMap<String, DocumentSchema>,
}

impl DataContract {
    /// Builds a contract and derives its id. Does not validate.
    pub fn new(owner_id: Identifier, document_schemas: BTreeMap<String, DocumentSchema>) -> Result<Self> {
        let id = Self::derive_id(&owner_id, &document_schemas)?;
        Ok(Self { id, owner_id, document_schemas })
    }

    pub fn derive_id(owner_id: &Identifier, schemas: &BTreeMap<String, DocumentSchema>) -> Result<Identifier> {
        let canonical = bincode::serde::encode_to_vec((owner_id, schemas), bincode::config::standard())
            .map_err(|e| KernelError::Encoding(e.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"data-contract");
        hasher.update(&canonical);
        Ok(Identifier::from_hash(hasher.finalize()))
    }

    pub fn schema(&self, document_type: &str) -> Result<&DocumentSchema> {
        self.document_schemas
            .get(document_type)
            .ok_or_else(|| KernelError::UnknownDocumentType(document_type.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.document_schemas.is_empty() {
            return Err(KernelError::InvalidDataContract("contract defines no document types".into()));
        }
        for (name, schema) in &self.document_schemas {
            schema.validate(name)?;
        }
        Ok(())
    }
}

/// Result of a registry write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractRegistration {
    pub contract: DataContract,
    /// False when identical content was already registered.
    pub created: bool,
}

#[derive(Clone, Debug, Default)]
pub struct DataContractRegistry {
    contracts: FxHashMap<Identifier, DataContract>,
}

impl DataContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_contract(
        &mut self,
        owner_id: Identifier,
        document_schemas: BTreeMap<String, DocumentSchema>,
    ) -> Result<ContractRegistration> {
        let contract = DataContract::new(owner_id, document_schemas)?;
        if let Some(existing) = self.contracts.get(&contract.id) {
            return Ok(ContractRegistration { contract: existing.clone(), created: false });
        }
        contract.validate()?;
        self.contracts.insert(contract.id, contract.clone());
        tracing::debug!(contract = %contract.id, owner = %owner_id, "data contract registered");
        Ok(ContractRegistration { contract, created: true })
    }

    pub fn get_contract(&self, id: &Identifier) -> Option<&DataContract> {
        self.contracts.get(id)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataContract> {
        self.contracts.values()
    }
}
