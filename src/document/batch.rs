// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Documents batch application.
//!
//! A batch is applied against shadow copies of the touched collections:
//! 1. Credit availability is checked for the whole batch
//! 2. Creates, then replaces, then deletes are applied to the shadow
//! 3. Credits are debited and the shadow collections replace the live ones
//!
//! If any step fails the shadow is dropped and nothing changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::contract::DataContract;
use crate::cost::CostPolicy;
use crate::document::collection::{DocumentCollection, DocumentStore};
use crate::document::validate::validate_data;
use crate::document::{Document, DocumentData};
use crate::error::{KernelError, Result};
use crate::identity::IdentityLedger;
use crate::types::{Credits, Identifier, Revision};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCreate {
    #[serde(rename = "$type")]
    pub document_type: String,
    #[serde(rename = "$entropy")]
    pub entropy: [u8; 32],
    pub data: DocumentData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReplace {
    #[serde(rename = "$id")]
    pub id: Identifier,
    #[serde(rename = "$type")]
    pub document_type: String,
    /// Revision the new content was based on.
    #[serde(rename = "$revision")]
    pub revision: Revision,
    pub data: DocumentData,
}

impl DocumentReplace {
    /// Replacement of `doc` with new data.
    pub fn of(doc: &Document, data: DocumentData) -> Self {
        Self {
            id: doc.id,
            document_type: doc.document_type.clone(),
            revision: doc.revision,
            data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentDelete {
    #[serde(rename = "$id")]
    pub id: Identifier,
    #[serde(rename = "$type")]
    pub document_type: String,
}

impl DocumentDelete {
    pub fn of(doc: &Document) -> Self {
        Self { id: doc.id, document_type: doc.document_type.clone() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentsBatch {
    #[serde(default)]
    pub create: Vec<DocumentCreate>,
    #[serde(default)]
    pub replace: Vec<DocumentReplace>,
    #[serde(default)]
    pub delete: Vec<DocumentDelete>,
}

impl DocumentsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(mut self, op: DocumentCreate) -> Self {
        self.create.push(op);
        self
    }

    pub fn replace(mut self, op: DocumentReplace) -> Self {
        self.replace.push(op);
        self
    }

    pub fn delete(mut self, op: DocumentDelete) -> Self {
        self.delete.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.create.len() + self.replace.len() + self.delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialized size, the input of the cost policy.
    pub fn payload_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchResult {
    pub created: Vec<Document>,
    pub replaced: Vec<Document>,
    pub deleted: Vec<Identifier>,
    pub cost: Credits,
}

impl BatchResult {
    /// Post-state of every created or replaced document.
    pub fn committed_documents(&self) -> impl Iterator<Item = &Document> {
        self.created.iter().chain(self.replaced.iter())
    }
}

/// Staged copies of the collections touched by one batch.
struct ShadowBatch<'a> {
    contract: &'a DataContract,
    live: &'a DocumentStore,
    staged: BTreeMap<String, DocumentCollection>,
}

impl<'a> ShadowBatch<'a> {
    fn new(contract: &'a DataContract, live: &'a DocumentStore) -> Self {
        Self { contract, live, staged: BTreeMap::new() }
    }

    fn collection(&mut self, document_type: &str) -> Result<&mut DocumentCollection> {
        let contract = self.contract;
        let live = self.live;
        let schema = contract.schema(document_type)?;
        Ok(self
            .staged
            .entry(document_type.to_string())
            .or_insert_with(|| live.snapshot(&contract.id, document_type, schema)))
    }

    fn create(&mut self, owner_id: &Identifier, op: &DocumentCreate) -> Result<Document> {
        let contract = self.contract;
        let schema = contract.schema(&op.document_type)?;
        validate_data(schema, &op.document_type, &op.data)?;

        let doc = Document {
            id: Document::generate_id(&contract.id, owner_id, &op.document_type, &op.entropy),
            document_type: op.document_type.clone(),
            contract_id: contract.id,
            owner_id: *owner_id,
            revision: 1,
            data: op.data.clone(),
        };
        self.collection(&op.document_type)?.insert(doc.clone())?;
        Ok(doc)
    }

    fn replace(&mut self, owner_id: &Identifier, op: &DocumentReplace) -> Result<Document> {
        let contract = self.contract;
        let schema = contract.schema(&op.document_type)?;
        validate_data(schema, &op.document_type, &op.data)?;

        let collection = self.collection(&op.document_type)?;
        let existing = collection.get(&op.id).ok_or(KernelError::DocumentNotFound(op.id))?;
        if existing.owner_id != *owner_id {
            return Err(KernelError::NotAuthorized { identity_id: *owner_id, document_id: op.id });
        }
        if existing.revision != op.revision {
            return Err(KernelError::RevisionConflict {
                document_id: op.id,
                expected: op.revision,
                actual: existing.revision,
            });
        }

        let doc = Document {
            revision: existing.revision + 1,
            data: op.data.clone(),
            ..existing.clone()
        };
        collection.replace(doc.clone())?;
        Ok(doc)
    }

    fn delete(&mut self, owner_id: &Identifier, op: &DocumentDelete) -> Result<Identifier> {
        let collection = self.collection(&op.document_type)?;
        let existing = collection.get(&op.id).ok_or(KernelError::DocumentNotFound(op.id))?;
        if existing.owner_id != *owner_id {
            return Err(KernelError::NotAuthorized { identity_id: *owner_id, document_id: op.id });
        }
        collection.remove(&op.id)?;
        Ok(op.id)
    }

    fn into_staged(self) -> BTreeMap<String, DocumentCollection> {
        self.staged
    }
}

impl DocumentStore {
    /// Applies `batch` for `owner_id` atomically, debiting its cost.
    pub fn apply_batch(
        &mut self,
        ledger: &mut IdentityLedger,
        contract: &DataContract,
        owner_id: &Identifier,
        batch: &DocumentsBatch,
        cost_policy: &dyn CostPolicy,
    ) -> Result<BatchResult> {
        if batch.is_empty() {
            return Err(KernelError::EmptyBatch);
        }

        let cost = cost_policy.batch_cost(batch.payload_len(), batch.len());
        ledger.ensure_balance(owner_id, cost)?;

        let mut result = BatchResult { cost, ..BatchResult::default() };
        let mut shadow = ShadowBatch::new(contract, self);
        for op in &batch.create {
            result.created.push(shadow.create(owner_id, op)?);
        }
        for op in &batch.replace {
            result.replaced.push(shadow.replace(owner_id, op)?);
        }
        for op in &batch.delete {
            result.deleted.push(shadow.delete(owner_id, op)?);
        }
        let staged = shadow.into_staged();

        // Commit boundary.
        ledger.debit(owner_id, cost)?;
        for (_, collection) in staged {
            self.install(contract.id, collection);
        }

        tracing::debug!(
            owner = %owner_id,
            contract = %contract.id,
            created = result.created.len(),
            replaced = result.replaced.len(),
            deleted = result.deleted.len(),
            cost,
            "documents batch committed"
        );
        Ok(result)
    }
}
