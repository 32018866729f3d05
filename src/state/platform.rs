// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Platform State definition.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::asset_lock::{AssetLockProof, CoreChainView};
use crate::contract::{ContractRegistration, DataContract, DataContractRegistry, DocumentSchema};
use crate::cost::{CostPolicy, SizeCostPolicy};
use crate::document::{BatchResult, Document, DocumentQuery, DocumentStore, DocumentsBatch};
use crate::error::{KernelError, Result};
use crate::identity::{Identity, IdentityLedger, IdentityPublicKey};
use crate::transition::StateTransition;
use crate::types::{Credits, Identifier, KeyId, PublicKeyHash, Version};

/// What an accepted transition changed.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionOutcome {
    IdentityCreated(Identity),
    IdentityToppedUp { identity_id: Identifier, balance: Credits },
    DataContractCreated(ContractRegistration),
    DocumentsCommitted(BatchResult),
}

/// Ledger, registry and documents behind a single serialized apply path.
#[derive(Clone, Debug)]
pub struct PlatformState {
    pub(crate) version: Version,
    pub(crate) ledger: IdentityLedger,
    pub(crate) registry: DataContractRegistry,
    pub(crate) documents: DocumentStore,
    cost_policy: Arc<dyn CostPolicy>,
}

impl Default for PlatformState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformState {
    pub fn new() -> Self {
        Self::with_cost_policy(Arc::new(SizeCostPolicy::default()))
    }

    pub fn with_cost_policy(cost_policy: Arc<dyn CostPolicy>) -> Self {
        Self {
            version: Version(0),
            ledger: IdentityLedger::new(),
            registry: DataContractRegistry::new(),
            documents: DocumentStore::new(),
            cost_policy,
        }
    }

    // --- Read APIs ---

    /// Number of accepted transitions.
    pub fn version(&self) -> u64 {
        self.version.0
    }

    pub fn ledger(&self) -> &IdentityLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &DataContractRegistry {
        &self.registry
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn cost_policy(&self) -> &dyn CostPolicy {
        self.cost_policy.as_ref()
    }

    pub fn get_identity(&self, id: &Identifier) -> Option<&Identity> {
        self.ledger.get(id)
    }

    pub fn get_identity_by_public_key_hash(&self, hash: &PublicKeyHash) -> Option<&Identity> {
        self.ledger.get_by_public_key_hash(hash)
    }

    pub fn get_contract(&self, id: &Identifier) -> Option<&DataContract> {
        self.registry.get_contract(id)
    }

    /// Unknown contracts and types read as empty.
    pub fn query_documents(&self, contract_id: &Identifier, document_type: &str, query: &DocumentQuery) -> Vec<Document> {
        match self.documents.collection(contract_id, document_type) {
            Some(collection) => query.run(collection),
            None => Vec::new(),
        }
    }

    pub fn get_document(&self, contract_id: &Identifier, document_type: &str, id: &Identifier) -> Option<&Document> {
        self.documents.get(contract_id, document_type, id)
    }

    // --- Write Logic ---

    pub fn create_identity(
        &mut self,
        proof: &AssetLockProof,
        public_keys: Vec<IdentityPublicKey>,
        core: &impl CoreChainView,
    ) -> Result<Identity> {
        let identity = self.ledger.create_identity(proof, public_keys, core)?;
        self.version = self.version.next();
        Ok(identity)
    }

    pub fn top_up(&mut self, identity_id: &Identifier, proof: &AssetLockProof, core: &impl CoreChainView) -> Result<Credits> {
        let balance = self.ledger.top_up(identity_id, proof, core)?;
        self.version = self.version.next();
        Ok(balance)
    }

    pub fn create_contract(
        &mut self,
        owner_id: &Identifier,
        document_schemas: BTreeMap<String, DocumentSchema>,
    ) -> Result<ContractRegistration> {
        if self.ledger.get(owner_id).is_none() {
            return Err(KernelError::IdentityNotFound(*owner_id));
        }
        let registration = self.registry.create_contract(*owner_id, document_schemas)?;
        if registration.created {
            self.version = self.version.next();
        }
        Ok(registration)
    }

    pub fn apply_batch(&mut self, identity_id: &Identifier, contract_id: &Identifier, batch: &DocumentsBatch) -> Result<BatchResult> {
        if self.ledger.get(identity_id).is_none() {
            return Err(KernelError::IdentityNotFound(*identity_id));
        }
        let contract = self
            .registry
            .get_contract(contract_id)
            .ok_or(KernelError::DataContractNotFound(*contract_id))?;
        let result = self
            .documents
            .apply_batch(&mut self.ledger, contract, identity_id, batch, self.cost_policy.as_ref())?;
        self.version = self.version.next();
        Ok(result)
    }

    /// Validates and applies one transition. Rejected transitions leave the
    /// state untouched.
    pub fn apply(&mut self, transition: &StateTransition, core: &impl CoreChainView) -> Result<TransitionOutcome> {
        match transition {
            StateTransition::IdentityCreate { asset_lock_proof, public_keys, .. } => self
                .create_identity(asset_lock_proof, public_keys.clone(), core)
                .map(TransitionOutcome::IdentityCreated),
            StateTransition::IdentityTopUp { identity_id, asset_lock_proof, .. } => self
                .top_up(identity_id, asset_lock_proof, core)
                .map(|balance| TransitionOutcome::IdentityToppedUp { identity_id: *identity_id, balance }),
            StateTransition::DataContractCreate { owner_id, document_schemas, signature_public_key_id, .. } => {
                self.check_signing_key(owner_id, *signature_public_key_id)?;
                self.create_contract(owner_id, document_schemas.clone())
                    .map(TransitionOutcome::DataContractCreated)
            }
            StateTransition::DocumentsBatch { owner_id, contract_id, batch, signature_public_key_id, .. } => {
                self.check_signing_key(owner_id, *signature_public_key_id)?;
                self.apply_batch(owner_id, contract_id, batch)
                    .map(TransitionOutcome::DocumentsCommitted)
            }
        }
    }

    fn check_signing_key(&self, identity_id: &Identifier, key_id: KeyId) -> Result<()> {
        let identity = self.ledger.get(identity_id).ok_or(KernelError::IdentityNotFound(*identity_id))?;
        if identity.public_key(key_id).is_none() {
            return Err(KernelError::InvalidSignaturePublicKey { identity_id: *identity_id, key_id });
        }
        Ok(())
    }
}
