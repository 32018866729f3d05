// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Committed document sets and their unique indices.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::contract::{DocumentSchema, IndexDefinition};
use crate::document::Document;
use crate::error::{KernelError, Result};
use crate::types::Identifier;

#[derive(Clone, Debug)]
struct UniqueIndex {
    definition: IndexDefinition,
    keys: FxHashMap<Vec<u8>, Identifier>,
}

impl UniqueIndex {
    fn key_of(&self, doc: &Document) -> Vec<u8> {
        let mut key = Vec::new();
        for p in &self.definition.properties {
            let encoded = serde_json::to_vec(&doc.field_value(&p.field)).unwrap_or_default();
            key.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
            key.extend_from_slice(&encoded);
        }
        key
    }
}

/// Every document of one `(contract, type)` pair.
#[derive(Clone, Debug)]
pub struct DocumentCollection {
    document_type: String,
    documents: BTreeMap<Identifier, Document>,
    /// Deleted ids. Never reissued.
    tombstones: FxHashSet<Identifier>,
    unique: Vec<UniqueIndex>,
}

impl DocumentCollection {
    pub fn new(document_type: &str, schema: &DocumentSchema) -> Self {
        let unique = schema
            .indices
            .iter()
            .filter(|i| i.unique)
            .map(|definition| UniqueIndex { definition: definition.clone(), keys: FxHashMap::default() })
            .collect();
        Self {
            document_type: document_type.to_string(),
            documents: BTreeMap::new(),
            tombstones: FxHashSet::default(),
            unique,
        }
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn get(&self, id: &Identifier) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn is_tombstoned(&self, id: &Identifier) -> bool {
        self.tombstones.contains(id)
    }

    /// Live documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub(crate) fn tombstones(&self) -> impl Iterator<Item = &Identifier> {
        self.tombstones.iter()
    }

    /// Fails if `doc` collides with another document on any unique index.
    pub fn check_unique(&self, doc: &Document) -> Result<()> {
        for index in &self.unique {
            if let Some(holder) = index.keys.get(&index.key_of(doc)) {
                if *holder != doc.id {
                    return Err(KernelError::UniqueIndexViolation {
                        document_type: self.document_type.clone(),
                        index: index.definition.name(),
                        conflicting_id: *holder,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, doc: Document) -> Result<()> {
        if self.documents.contains_key(&doc.id) || self.tombstones.contains(&doc.id) {
            return Err(KernelError::DocumentAlreadyExists(doc.id));
        }
        self.check_unique(&doc)?;
        for index in &mut self.unique {
            let key = index.key_of(&doc);
            index.keys.insert(key, doc.id);
        }
        self.documents.insert(doc.id, doc);
        Ok(())
    }

    /// Swaps in new content for an existing id.
    pub fn replace(&mut self, doc: Document) -> Result<()> {
        self.check_unique(&doc)?;
        let old = self.documents.remove(&doc.id).ok_or(KernelError::DocumentNotFound(doc.id))?;
        for index in &mut self.unique {
            let old_key = index.key_of(&old);
            index.keys.remove(&old_key);
            let key = index.key_of(&doc);
            index.keys.insert(key, doc.id);
        }
        self.documents.insert(doc.id, doc);
        Ok(())
    }

    pub fn remove(&mut self, id: &Identifier) -> Result<Document> {
        let old = self.documents.remove(id).ok_or(KernelError::DocumentNotFound(*id))?;
        for index in &mut self.unique {
            let key = index.key_of(&old);
            index.keys.remove(&key);
        }
        self.tombstones.insert(*id);
        Ok(old)
    }
}

/// Collections keyed by `(contract id, document type)`.
#[derive(Clone, Debug, Default)]
pub struct DocumentStore {
    collections: BTreeMap<(Identifier, String), DocumentCollection>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, contract_id: &Identifier, document_type: &str) -> Option<&DocumentCollection> {
        self.collections.get(&(*contract_id, document_type.to_string()))
    }

    pub fn get(&self, contract_id: &Identifier, document_type: &str, id: &Identifier) -> Option<&Document> {
        self.collection(contract_id, document_type).and_then(|c| c.get(id))
    }

    /// Copy of the committed collection, or an empty one for a new type.
    pub(crate) fn snapshot(&self, contract_id: &Identifier, document_type: &str, schema: &DocumentSchema) -> DocumentCollection {
        self.collection(contract_id, document_type)
            .cloned()
            .unwrap_or_else(|| DocumentCollection::new(document_type, schema))
    }

    pub(crate) fn install(&mut self, contract_id: Identifier, collection: DocumentCollection) {
        let key = (contract_id, collection.document_type.clone());
        self.collections.insert(key, collection);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Identifier, String), &DocumentCollection)> {
        self.collections.iter()
    }
}
