// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Asset Lock Proofs.
//!
//! An asset lock proof commits to exactly one core-chain output that was
//! irrevocably locked for credit issuance. Two confirmation flavours exist:
//! - **Instant**: the proof embeds the transaction and an instant lock over it
//! - **ChainLock**: the proof names the output and the chain-locked height that
//!   covers it; the output itself is resolved through [`CoreChainView`]

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::types::{Duffs, OutPoint, TxId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputScript {
    PayToAddress(String),
    /// Burns the value into platform credits.
    AssetLock,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: Duffs,
    pub script: OutputScript,
}

/// Minimal view of a core-chain transaction funding the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingTransaction {
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOutput>,
}

impl FundingTransaction {
    pub fn new(inputs: Vec<OutPoint>, outputs: Vec<TxOutput>) -> Self {
        Self { inputs, outputs }
    }

    /// Single asset-lock output of `value`, optionally followed by change.
    pub fn asset_lock(inputs: Vec<OutPoint>, value: Duffs, change: Option<(String, Duffs)>) -> Self {
        let mut outputs = vec![TxOutput { value, script: OutputScript::AssetLock }];
        if let Some((address, amount)) = change {
            outputs.push(TxOutput { value: amount, script: OutputScript::PayToAddress(address) });
        }
        Self::new(inputs, outputs)
    }

    /// Canonical bincode encoding, also the raw broadcast form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| KernelError::Encoding(e.to_string()))
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let (tx, read) = bincode::serde::decode_from_slice::<Self, _>(raw, bincode::config::standard())
            .map_err(|e| KernelError::Encoding(e.to_string()))?;
        if read != raw.len() {
            return Err(KernelError::Encoding("trailing bytes after transaction".into()));
        }
        Ok(tx)
    }

    /// Hash over the length-prefixed inputs and outputs. Infallible, so it
    /// does not go through the bincode encoder.
    pub fn txid(&self) -> TxId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            hasher.update(&input.to_bytes());
        }
        hasher.update(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            hasher.update(&output.value.to_le_bytes());
            match &output.script {
                OutputScript::PayToAddress(address) => {
                    hasher.update(&[0]);
                    hasher.update(&(address.len() as u32).to_le_bytes());
                    hasher.update(address.as_bytes());
                }
                OutputScript::AssetLock => {
                    hasher.update(&[1]);
                }
            }
        }
        TxId(*hasher.finalize().as_bytes())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofType {
    Instant,
    ChainLock,
}

/// Instant lock over a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantLock {
    pub txid: TxId,
    pub inputs: Vec<OutPoint>,
}

impl InstantLock {
    pub fn for_transaction(tx: &FundingTransaction) -> Self {
        Self { txid: tx.txid(), inputs: tx.inputs.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofPayload {
    Instant {
        instant_lock: InstantLock,
        transaction: FundingTransaction,
    },
    ChainLock {
        core_chain_locked_height: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLockProof {
    pub source_transaction_id: TxId,
    pub output_index: u32,
    pub proof_type: ProofType,
    pub payload: ProofPayload,
}

impl AssetLockProof {
    pub fn instant(transaction: FundingTransaction, output_index: u32) -> Self {
        let instant_lock = InstantLock::for_transaction(&transaction);
        Self::instant_with_lock(transaction, output_index, instant_lock)
    }

    /// Instant proof carrying an externally produced lock.
    pub fn instant_with_lock(transaction: FundingTransaction, output_index: u32, instant_lock: InstantLock) -> Self {
        Self {
            source_transaction_id: transaction.txid(),
            output_index,
            proof_type: ProofType::Instant,
            payload: ProofPayload::Instant { instant_lock, transaction },
        }
    }

    pub fn chain(tx_id: TxId, output_index: u32, core_chain_locked_height: u32) -> Self {
        Self {
            source_transaction_id: tx_id,
            output_index,
            proof_type: ProofType::ChainLock,
            payload: ProofPayload::ChainLock { core_chain_locked_height },
        }
    }

    pub fn out_point(&self) -> OutPoint {
        OutPoint::new(self.source_transaction_id, self.output_index)
    }

    /// Resolves the locked output this proof commits to.
    ///
    /// Anything that prevents resolution is reported as
    /// `AssetLockTransactionNotFound`.
    pub fn resolve(&self, core: &impl CoreChainView) -> Result<LockedOutput> {
        let not_found = || KernelError::AssetLockTransactionNotFound {
            tx_id: self.source_transaction_id,
            output_index: self.output_index,
        };

        let output = match (&self.proof_type, &self.payload) {
            (ProofType::Instant, ProofPayload::Instant { instant_lock, transaction }) => {
                let txid = transaction.txid();
                if txid != self.source_transaction_id || instant_lock.txid != txid {
                    return Err(not_found());
                }
                transaction
                    .outputs
                    .get(self.output_index as usize)
                    .cloned()
                    .ok_or_else(not_found)?
            }
            (ProofType::ChainLock, ProofPayload::ChainLock { core_chain_locked_height }) => {
                if *core_chain_locked_height > core.chain_locked_height() {
                    return Err(not_found());
                }
                let found = core.funding_output(&self.out_point()).ok_or_else(not_found)?;
                if found.height > *core_chain_locked_height {
                    return Err(not_found());
                }
                found.output
            }
            _ => return Err(not_found()),
        };

        if output.script != OutputScript::AssetLock {
            return Err(not_found());
        }

        Ok(LockedOutput { out_point: self.out_point(), value: output.value })
    }
}

/// An output that was proven locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockedOutput {
    pub out_point: OutPoint,
    pub value: Duffs,
}

/// A mined output as seen by the core chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinedOutput {
    pub output: TxOutput,
    pub height: u32,
}

/// Read-only view of core-chain state needed to resolve chain-lock proofs.
pub trait CoreChainView {
    fn funding_output(&self, out_point: &OutPoint) -> Option<MinedOutput>;
    fn chain_locked_height(&self) -> u32;
}

/// Core view with nothing mined. Only instant proofs resolve against it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCoreChain;

impl CoreChainView for NoCoreChain {
    fn funding_output(&self, _out_point: &OutPoint) -> Option<MinedOutput> {
        None
    }

    fn chain_locked_height(&self) -> u32 {
        0
    }
}

/// In-memory core view.
#[derive(Clone, Debug, Default)]
pub struct StaticCoreChain {
    outputs: FxHashMap<OutPoint, MinedOutput>,
    chain_locked_height: u32,
}

impl StaticCoreChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mine(&mut self, tx: &FundingTransaction, height: u32) -> TxId {
        let txid = tx.txid();
        for (i, output) in tx.outputs.iter().enumerate() {
            self.outputs.insert(
                OutPoint::new(txid, i as u32),
                MinedOutput { output: output.clone(), height },
            );
        }
        txid
    }

    pub fn set_chain_locked_height(&mut self, height: u32) {
        self.chain_locked_height = height;
    }
}

impl CoreChainView for StaticCoreChain {
    fn funding_output(&self, out_point: &OutPoint) -> Option<MinedOutput> {
        self.outputs.get(out_point).cloned()
    }

    fn chain_locked_height(&self) -> u32 {
        self.chain_locked_height
    }
}

impl<T: CoreChainView + ?Sized> CoreChainView for &T {
    fn funding_output(&self, out_point: &OutPoint) -> Option<MinedOutput> {
        (**self).funding_output(out_point)
    }

    fn chain_locked_height(&self) -> u32 {
        (**self).chain_locked_height()
    }
}
