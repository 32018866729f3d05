// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-process core chain and platform.
//!
//! `LocalChain` confirms transactions after a configurable instant-lock
//! delay and lets callers mine and chain-lock blocks by hand.
//! `LocalPlatform` applies transitions through one serialized path and
//! exposes them to reads only after a propagation delay, which is what the
//! reconciler exists to absorb.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::time::Instant;

use platform_kernel::asset_lock::{
    CoreChainView, FundingTransaction, InstantLock, MinedOutput, OutputScript, TxOutput,
};
use platform_kernel::contract::DataContract;
use platform_kernel::cost::CostPolicy;
use platform_kernel::document::{Document, DocumentQuery};
use platform_kernel::identity::Identity;
use platform_kernel::state::PlatformState;
use platform_kernel::transition::StateTransition;
use platform_kernel::types::{Duffs, Identifier, OutPoint, PublicKeyHash, TxId};
use platform_kernel::verify::platform_state_hash;

use crate::chain::{ChainObserver, ConfirmationStatus, ReadEndpoint, TransitionBroadcaster};
use crate::config::NodeConfig;
use crate::errors::{NodeError, RemoteValidationError};

#[derive(Debug)]
struct ChainTx {
    tx: FundingTransaction,
    seen_at: Instant,
    instant_lockable: bool,
    mined_height: Option<u32>,
}

#[derive(Debug)]
struct ChainState {
    transactions: FxHashMap<TxId, ChainTx>,
    mempool: Vec<TxId>,
    tip_height: u32,
    chain_locked_height: u32,
    instant_locks_enabled: bool,
    faucet_nonce: u64,
}

#[derive(Debug)]
pub struct LocalChain {
    state: Mutex<ChainState>,
    instant_lock_delay: Duration,
}

impl LocalChain {
    pub fn new(instant_lock_delay: Duration) -> Self {
        Self {
            state: Mutex::new(ChainState {
                transactions: FxHashMap::default(),
                mempool: Vec::new(),
                tip_height: 0,
                chain_locked_height: 0,
                instant_locks_enabled: true,
                faucet_nonce: 0,
            }),
            instant_lock_delay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transactions submitted while disabled are never instant-locked.
    pub fn set_instant_locks_enabled(&self, enabled: bool) {
        self.lock().instant_locks_enabled = enabled;
    }

    /// Mines every pending transaction into a new block.
    pub fn mine_block(&self) -> u32 {
        let mut state = self.lock();
        state.tip_height += 1;
        let height = state.tip_height;
        let pending = std::mem::take(&mut state.mempool);
        for tx_id in &pending {
            if let Some(entry) = state.transactions.get_mut(tx_id) {
                entry.mined_height = Some(height);
            }
        }
        tracing::debug!(height, transactions = pending.len(), "block mined");
        height
    }

    pub fn chain_lock_tip(&self) -> u32 {
        let mut state = self.lock();
        state.chain_locked_height = state.tip_height;
        state.chain_locked_height
    }

    pub fn tip_height(&self) -> u32 {
        self.lock().tip_height
    }

    /// Sends `amount` to `address` from an unlimited faucet.
    pub fn fund_address(&self, address: &str, amount: Duffs) -> TxId {
        let nonce = {
            let mut state = self.lock();
            state.faucet_nonce += 1;
            state.faucet_nonce
        };
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"faucet");
        hasher.update(&nonce.to_le_bytes());
        let input = OutPoint::new(TxId(*hasher.finalize().as_bytes()), 0);

        let tx = FundingTransaction::new(
            vec![input],
            vec![TxOutput { value: amount, script: OutputScript::PayToAddress(address.to_string()) }],
        );
        self.submit(tx)
    }

    fn submit(&self, tx: FundingTransaction) -> TxId {
        let tx_id = tx.txid();
        let mut state = self.lock();
        if state.transactions.contains_key(&tx_id) {
            return tx_id;
        }
        let instant_lockable = state.instant_locks_enabled;
        state.transactions.insert(
            tx_id,
            ChainTx { tx, seen_at: Instant::now(), instant_lockable, mined_height: None },
        );
        state.mempool.push(tx_id);
        tracing::debug!(%tx_id, "transaction accepted to mempool");
        tx_id
    }

    fn status_of(&self, state: &ChainState, entry: &ChainTx) -> ConfirmationStatus {
        let instant_lock = (entry.instant_lockable && entry.seen_at.elapsed() >= self.instant_lock_delay)
            .then(|| InstantLock::for_transaction(&entry.tx));
        let chain_locked_height = entry
            .mined_height
            .filter(|h| *h <= state.chain_locked_height)
            .map(|_| state.chain_locked_height);
        ConfirmationStatus { instant_lock, chain_locked_height, block_height: entry.mined_height }
    }
}

impl CoreChainView for LocalChain {
    fn funding_output(&self, out_point: &OutPoint) -> Option<MinedOutput> {
        let state = self.lock();
        let entry = state.transactions.get(&out_point.tx_id)?;
        let height = entry.mined_height?;
        let output = entry.tx.outputs.get(out_point.output_index as usize)?.clone();
        Some(MinedOutput { output, height })
    }

    fn chain_locked_height(&self) -> u32 {
        self.lock().chain_locked_height
    }
}

impl ChainObserver for LocalChain {
    async fn confirmation_status(&self, tx_id: TxId) -> Result<ConfirmationStatus, NodeError> {
        let state = self.lock();
        Ok(state
            .transactions
            .get(&tx_id)
            .map(|entry| self.status_of(&state, entry))
            .unwrap_or_default())
    }

    async fn broadcast_transaction(&self, raw: Vec<u8>) -> Result<TxId, NodeError> {
        let tx = FundingTransaction::from_bytes(&raw).map_err(|e| NodeError::Codec(e.to_string()))?;
        Ok(self.submit(tx))
    }

    async fn address_balance(&self, address: String) -> Result<Duffs, NodeError> {
        let state = self.lock();
        let balance = state
            .transactions
            .values()
            .filter(|entry| self.status_of(&state, entry).is_final() || entry.mined_height.is_some())
            .flat_map(|entry| entry.tx.outputs.iter())
            .filter(|out| matches!(&out.script, OutputScript::PayToAddress(a) if *a == address))
            .map(|out| out.value)
            .sum();
        Ok(balance)
    }
}

#[derive(Debug)]
struct PlatformInner {
    chain: Arc<LocalChain>,
    /// Single serialized apply path.
    live: tokio::sync::Mutex<PlatformState>,
    /// What readers see.
    published: RwLock<Arc<PlatformState>>,
    propagation_delay: Duration,
}

impl PlatformInner {
    fn publish(&self, snapshot: Arc<PlatformState>) {
        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        // Delayed publishes may land out of order.
        if snapshot.version() > published.version() {
            tracing::debug!(version = snapshot.version(), "state published to readers");
            *published = snapshot;
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocalPlatform {
    inner: Arc<PlatformInner>,
}

impl LocalPlatform {
    pub fn new(chain: Arc<LocalChain>, cost_policy: Arc<dyn CostPolicy>, propagation_delay: Duration) -> Self {
        let state = PlatformState::with_cost_policy(cost_policy);
        Self {
            inner: Arc::new(PlatformInner {
                chain,
                published: RwLock::new(Arc::new(state.clone())),
                live: tokio::sync::Mutex::new(state),
                propagation_delay,
            }),
        }
    }

    fn view(&self) -> Arc<PlatformState> {
        Arc::clone(&self.inner.published.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Hash of the committed, not necessarily published, state.
    pub async fn state_hash(&self) -> [u8; 32] {
        platform_state_hash(&*self.inner.live.lock().await)
    }

    pub fn published_version(&self) -> u64 {
        self.view().version()
    }

    fn schedule_publish(&self, snapshot: Arc<PlatformState>) {
        let delay = self.inner.propagation_delay;
        if delay.is_zero() {
            self.inner.publish(snapshot);
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.publish(snapshot);
        });
    }

    fn reject(kind: &str, err: &platform_kernel::error::KernelError) -> NodeError {
        tracing::warn!(kind, error = %err, "state transition rejected");
        metrics::increment_counter!("platform_transitions_rejected_total", "kind" => kind.to_string());
        RemoteValidationError::from_kernel(err).into()
    }
}

impl TransitionBroadcaster for LocalPlatform {
    async fn broadcast_state_transition(&self, bytes: Vec<u8>) -> Result<(), NodeError> {
        let transition = StateTransition::from_bytes(&bytes).map_err(|e| Self::reject("unknown", &e))?;
        let kind = format!("{:?}", transition.kind());

        let snapshot = {
            let mut live = self.inner.live.lock().await;
            live.apply(&transition, self.inner.chain.as_ref())
                .map_err(|e| Self::reject(&kind, &e))?;
            tracing::info!(kind = %kind, version = live.version(), "state transition applied");
            Arc::new(live.clone())
        };

        metrics::increment_counter!("platform_transitions_applied_total", "kind" => kind);
        self.schedule_publish(snapshot);
        Ok(())
    }
}

impl ReadEndpoint for LocalPlatform {
    async fn fetch_identity(&self, id: Identifier) -> Result<Option<Identity>, NodeError> {
        Ok(self.view().get_identity(&id).cloned())
    }

    async fn fetch_identities_by_public_key_hashes(
        &self,
        hashes: Vec<PublicKeyHash>,
    ) -> Result<Vec<Option<Identity>>, NodeError> {
        let view = self.view();
        Ok(hashes.iter().map(|h| view.get_identity_by_public_key_hash(h).cloned()).collect())
    }

    async fn fetch_identity_ids_by_public_key_hashes(
        &self,
        hashes: Vec<PublicKeyHash>,
    ) -> Result<Vec<Option<Identifier>>, NodeError> {
        let view = self.view();
        Ok(hashes.iter().map(|h| view.ledger().get_id_by_public_key_hash(h)).collect())
    }

    async fn fetch_data_contract(&self, id: Identifier) -> Result<Option<DataContract>, NodeError> {
        Ok(self.view().get_contract(&id).cloned())
    }

    async fn fetch_documents(
        &self,
        contract_id: Identifier,
        document_type: String,
        query: DocumentQuery,
    ) -> Result<Vec<Document>, NodeError> {
        Ok(self.view().query_documents(&contract_id, &document_type, &query))
    }
}

/// A local chain and the platform anchored on it.
#[derive(Clone, Debug)]
pub struct LocalNetwork {
    pub chain: Arc<LocalChain>,
    pub platform: LocalPlatform,
}

impl LocalNetwork {
    pub fn new(config: &NodeConfig) -> Self {
        let chain = Arc::new(LocalChain::new(config.instant_lock_delay));
        let platform = LocalPlatform::new(Arc::clone(&chain), Arc::new(config.cost_policy()), config.propagation_delay);
        Self { chain, platform }
    }
}
