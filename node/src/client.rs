// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! High-level platform flows.
//!
//! Every write broadcasts one transition and then reconciles until its
//! post-condition is visible through the read endpoint.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use platform_kernel::asset_lock::{AssetLockProof, FundingTransaction};
use platform_kernel::contract::{DataContract, DocumentSchema};
use platform_kernel::document::{Document, DocumentCreate, DocumentData, DocumentQuery, DocumentsBatch};
use platform_kernel::error::KernelError;
use platform_kernel::identity::{Identity, IdentityPublicKey};
use platform_kernel::transition::StateTransition;
use platform_kernel::types::{Credits, Duffs, Identifier, KeyId, OutPoint, PublicKeyHash, TxId};

use crate::chain::{ChainObserver, ReadEndpoint, TransitionBroadcaster};
use crate::config::{NodeConfig, PollOptions};
use crate::errors::NodeError;
use crate::prover::AssetLockProver;
use crate::reconciler::{await_condition, retry_with_backoff};

pub struct PlatformClient<C, P> {
    chain: C,
    platform: P,
    prover: AssetLockProver<C>,
    config: NodeConfig,
    wallet_address: String,
    nonce: AtomicU64,
}

impl<C, P> PlatformClient<C, P>
where
    C: ChainObserver + Clone,
    P: TransitionBroadcaster + ReadEndpoint,
{
    pub fn new(chain: C, platform: P, config: NodeConfig, wallet_address: impl Into<String>) -> Self {
        let prover = AssetLockProver::new(chain.clone(), config.proof_poll);
        Self {
            chain,
            platform,
            prover,
            config,
            wallet_address: wallet_address.into(),
            nonce: AtomicU64::new(0),
        }
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn prover(&self) -> &AssetLockProver<C> {
        &self.prover
    }

    /// Fresh 32 bytes, unique per client and call.
    pub fn next_entropy(&self) -> [u8; 32] {
        let n = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.wallet_address.as_bytes());
        hasher.update(&n.to_le_bytes());
        *hasher.finalize().as_bytes()
    }

    pub fn document_create(&self, document_type: &str, data: DocumentData) -> DocumentCreate {
        DocumentCreate { document_type: document_type.to_string(), entropy: self.next_entropy(), data }
    }

    // --- Wallet ---

    /// Waits until the wallet's confirmed balance reaches `target`.
    pub async fn wait_for_balance(&self, target: Duffs) -> Result<Duffs, NodeError> {
        let chain = &self.chain;
        let address = &self.wallet_address;
        await_condition(|| chain.address_balance(address.clone()), |b| *b >= target, &self.config.poll).await
    }

    /// Broadcasts a transaction locking `amount` for platform credits.
    pub async fn create_asset_lock(&self, amount: Duffs) -> Result<FundingTransaction, NodeError> {
        let input = OutPoint::new(TxId(self.next_entropy()), 0);
        let tx = FundingTransaction::asset_lock(vec![input], amount, None);
        let tx_id = self.chain.broadcast_transaction(tx.to_bytes()?).await?;
        tracing::debug!(%tx_id, amount, "asset lock transaction broadcast");
        Ok(tx)
    }

    pub async fn build_asset_lock_proof(&self, amount: Duffs) -> Result<AssetLockProof, NodeError> {
        let tx = self.create_asset_lock(amount).await?;
        self.prover.build_proof(&tx, 0).await
    }

    // --- Identities ---

    pub async fn register_identity(&self, public_keys: Vec<IdentityPublicKey>) -> Result<Identity, NodeError> {
        let proof = self.build_asset_lock_proof(self.config.identity_funding_duffs).await?;
        self.register_identity_with_proof(proof, public_keys).await
    }

    pub async fn register_identity_with_proof(
        &self,
        proof: AssetLockProof,
        public_keys: Vec<IdentityPublicKey>,
    ) -> Result<Identity, NodeError> {
        let id = Identity::id_from_out_point(&proof.out_point());
        self.broadcast(&StateTransition::IdentityCreate { asset_lock_proof: proof, public_keys, signature: Vec::new() })
            .await?;

        let platform = &self.platform;
        let identity = await_some(|| platform.fetch_identity(id), &self.config.poll).await?;
        tracing::info!(identity = %id, balance = identity.balance, "identity registered");
        Ok(identity)
    }

    /// Returns the balance after the top-up is visible.
    pub async fn top_up(&self, identity_id: &Identifier, amount: Duffs) -> Result<Credits, NodeError> {
        if self.get_identity(identity_id).await?.is_none() {
            return Err(KernelError::IdentityNotFound(*identity_id).into());
        }
        let proof = self.build_asset_lock_proof(amount).await?;
        self.top_up_with_proof(identity_id, proof).await
    }

    /// The revision baseline is read here, right before the broadcast, so a
    /// caller's older snapshot cannot satisfy the wait early.
    pub async fn top_up_with_proof(&self, identity_id: &Identifier, proof: AssetLockProof) -> Result<Credits, NodeError> {
        let id = *identity_id;
        let revision = self
            .get_identity(&id)
            .await?
            .ok_or(KernelError::IdentityNotFound(id))?
            .revision;
        self.broadcast(&StateTransition::IdentityTopUp { identity_id: id, asset_lock_proof: proof, signature: Vec::new() })
            .await?;

        let platform = &self.platform;
        let after = await_condition(
            || platform.fetch_identity(id),
            |found| found.as_ref().is_some_and(|i| i.revision > revision),
            &self.config.poll,
        )
        .await?
        .ok_or(KernelError::IdentityNotFound(id))?;
        Ok(after.balance)
    }

    pub async fn get_identity(&self, id: &Identifier) -> Result<Option<Identity>, NodeError> {
        self.platform.fetch_identity(*id).await
    }

    pub async fn get_identity_by_public_key_hash(&self, hash: &PublicKeyHash) -> Result<Option<Identity>, NodeError> {
        let found = self.platform.fetch_identities_by_public_key_hashes(vec![*hash]).await?;
        Ok(found.into_iter().next().flatten())
    }

    pub async fn get_identities_by_public_key_hashes(
        &self,
        hashes: Vec<PublicKeyHash>,
    ) -> Result<Vec<Option<Identity>>, NodeError> {
        self.platform.fetch_identities_by_public_key_hashes(hashes).await
    }

    pub async fn get_identity_ids_by_public_key_hashes(
        &self,
        hashes: Vec<PublicKeyHash>,
    ) -> Result<Vec<Option<Identifier>>, NodeError> {
        self.platform.fetch_identity_ids_by_public_key_hashes(hashes).await
    }

    // --- Contracts ---

    pub async fn publish_contract(
        &self,
        owner: &Identity,
        document_schemas: BTreeMap<String, DocumentSchema>,
    ) -> Result<DataContract, NodeError> {
        let contract_id = DataContract::derive_id(&owner.id, &document_schemas)?;
        self.broadcast(&StateTransition::DataContractCreate {
            owner_id: owner.id,
            document_schemas,
            signature_public_key_id: signing_key(owner)?,
            signature: Vec::new(),
        })
        .await?;

        let platform = &self.platform;
        let contract = await_some(|| platform.fetch_data_contract(contract_id), &self.config.poll).await?;
        tracing::info!(contract = %contract_id, owner = %owner.id, "data contract published");
        Ok(contract)
    }

    pub async fn get_contract(&self, id: &Identifier) -> Result<Option<DataContract>, NodeError> {
        self.platform.fetch_data_contract(*id).await
    }

    // --- Documents ---

    /// Broadcasts `batch` and returns the documents it leaves live, as read
    /// back from the platform. Ids the same batch deletes are only awaited
    /// for absence and are not returned.
    pub async fn broadcast_documents(
        &self,
        owner: &Identity,
        contract_id: &Identifier,
        batch: DocumentsBatch,
    ) -> Result<Vec<Document>, NodeError> {
        let deleted: Vec<(String, Identifier)> =
            batch.delete.iter().map(|op| (op.document_type.clone(), op.id)).collect();
        let is_deleted = |id: &Identifier| deleted.iter().any(|(_, d)| d == id);

        let created: Vec<(String, Identifier)> = batch
            .create
            .iter()
            .map(|op| {
                (op.document_type.clone(), Document::generate_id(contract_id, &owner.id, &op.document_type, &op.entropy))
            })
            .filter(|(_, id)| !is_deleted(id))
            .collect();
        let replaced: Vec<(String, Identifier, u64)> = batch
            .replace
            .iter()
            .filter(|op| !is_deleted(&op.id))
            .map(|op| (op.document_type.clone(), op.id, op.revision + 1))
            .collect();

        self.broadcast(&StateTransition::DocumentsBatch {
            owner_id: owner.id,
            contract_id: *contract_id,
            batch,
            signature_public_key_id: signing_key(owner)?,
            signature: Vec::new(),
        })
        .await?;

        let mut committed = Vec::with_capacity(created.len() + replaced.len());
        for (document_type, id) in &created {
            let doc = await_some(|| self.get_document(contract_id, document_type, id), &self.config.poll).await?;
            committed.push(doc);
        }
        for (document_type, id, revision) in &replaced {
            let doc = await_condition(
                || self.get_document(contract_id, document_type, id),
                |found| found.as_ref().is_some_and(|d| d.revision >= *revision),
                &self.config.poll,
            )
            .await?
            .ok_or(KernelError::DocumentNotFound(*id))?;
            committed.push(doc);
        }
        for (document_type, id) in &deleted {
            await_condition(|| self.get_document(contract_id, document_type, id), Option::is_none, &self.config.poll)
                .await?;
        }

        tracing::info!(
            owner = %owner.id,
            contract = %contract_id,
            created = created.len(),
            replaced = replaced.len(),
            deleted = deleted.len(),
            "documents batch observed"
        );
        Ok(committed)
    }

    pub async fn get_documents(
        &self,
        contract_id: &Identifier,
        document_type: &str,
        query: DocumentQuery,
    ) -> Result<Vec<Document>, NodeError> {
        self.platform.fetch_documents(*contract_id, document_type.to_string(), query).await
    }

    /// Absent ids, including deleted ones, read as `None`.
    pub async fn get_document(
        &self,
        contract_id: &Identifier,
        document_type: &str,
        id: &Identifier,
    ) -> Result<Option<Document>, NodeError> {
        let found = self.get_documents(contract_id, document_type, DocumentQuery::by_id(id)).await?;
        Ok(found.into_iter().next())
    }

    // --- Transport ---

    async fn broadcast(&self, transition: &StateTransition) -> Result<(), NodeError> {
        let bytes = transition.to_bytes()?;
        let platform = &self.platform;
        retry_with_backoff(|| platform.broadcast_state_transition(bytes.clone()), &self.config.broadcast_retry).await?;
        tracing::debug!(kind = ?transition.kind(), "state transition accepted");
        Ok(())
    }
}

/// Polls until the value is present.
async fn await_some<T, F, Fut>(poll: F, options: &PollOptions) -> Result<T, NodeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, NodeError>>,
{
    await_condition(poll, Option::is_some, options)
        .await?
        .ok_or(NodeError::Timeout { attempts: options.max_attempts })
}

fn signing_key(identity: &Identity) -> Result<KeyId, NodeError> {
    identity.public_keys.first().map(|k| k.id).ok_or_else(|| {
        NodeError::Kernel(KernelError::InvalidSignaturePublicKey { identity_id: identity.id, key_id: KeyId(0) })
    })
}
