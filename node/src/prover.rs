// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Asset Lock Prover.

use platform_kernel::asset_lock::{AssetLockProof, FundingTransaction};

use crate::chain::ChainObserver;
use crate::config::PollOptions;
use crate::errors::NodeError;
use crate::reconciler::await_condition;

/// Builds asset-lock proofs once the chain reports a transaction final.
#[derive(Clone, Debug)]
pub struct AssetLockProver<C> {
    chain: C,
    poll: PollOptions,
}

impl<C: ChainObserver> AssetLockProver<C> {
    pub fn new(chain: C, poll: PollOptions) -> Self {
        Self { chain, poll }
    }

    /// Waits for an instant lock or a chain lock, preferring the instant
    /// lock when both are visible.
    pub async fn build_proof(&self, transaction: &FundingTransaction, output_index: u32) -> Result<AssetLockProof, NodeError> {
        let tx_id = transaction.txid();
        let chain = &self.chain;

        let status = await_condition(|| chain.confirmation_status(tx_id), |s| s.is_final(), &self.poll)
            .await
            .map_err(|e| match e {
                NodeError::Timeout { attempts } => {
                    tracing::warn!(%tx_id, attempts, "funding transaction never became final");
                    NodeError::ProofUnavailable { tx_id }
                }
                other => other,
            })?;

        let proof = match (status.instant_lock, status.chain_locked_height) {
            (Some(lock), _) => AssetLockProof::instant_with_lock(transaction.clone(), output_index, lock),
            (None, Some(height)) => AssetLockProof::chain(tx_id, output_index, height),
            (None, None) => return Err(NodeError::ProofUnavailable { tx_id }),
        };

        metrics::increment_counter!("platform_proofs_built_total", "type" => format!("{:?}", proof.proof_type));
        tracing::info!(%tx_id, output_index, proof_type = ?proof.proof_type, "asset lock proof built");
        Ok(proof)
    }
}
