// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! External collaborator interfaces.
//!
//! The host talks to the core chain and to the platform only through these
//! traits. Every call is a suspension point; reads are eventually consistent
//! with broadcasts and must be reconciled by the caller.

use std::future::Future;
use std::sync::Arc;

use platform_kernel::asset_lock::InstantLock;
use platform_kernel::contract::DataContract;
use platform_kernel::document::{Document, DocumentQuery};
use platform_kernel::identity::Identity;
use platform_kernel::types::{Duffs, Identifier, PublicKeyHash, TxId};

use crate::errors::NodeError;

/// Finality of one core-chain transaction as currently observed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfirmationStatus {
    pub instant_lock: Option<InstantLock>,
    /// Chain-locked height covering the transaction, once it has one.
    pub chain_locked_height: Option<u32>,
    pub block_height: Option<u32>,
}

impl ConfirmationStatus {
    pub fn instant_locked(&self) -> bool {
        self.instant_lock.is_some()
    }

    pub fn chain_locked(&self) -> bool {
        self.chain_locked_height.is_some()
    }

    /// Redeemable by an asset-lock proof.
    pub fn is_final(&self) -> bool {
        self.instant_locked() || self.chain_locked()
    }
}

pub trait ChainObserver: Send + Sync {
    fn confirmation_status(&self, tx_id: TxId) -> impl Future<Output = Result<ConfirmationStatus, NodeError>> + Send;

    fn broadcast_transaction(&self, raw: Vec<u8>) -> impl Future<Output = Result<TxId, NodeError>> + Send;

    /// Confirmed pay-to-address balance.
    fn address_balance(&self, address: String) -> impl Future<Output = Result<Duffs, NodeError>> + Send;
}

pub trait TransitionBroadcaster: Send + Sync {
    /// Accepted means validated and applied; not necessarily readable yet.
    fn broadcast_state_transition(&self, bytes: Vec<u8>) -> impl Future<Output = Result<(), NodeError>> + Send;
}

pub trait ReadEndpoint: Send + Sync {
    fn fetch_identity(&self, id: Identifier) -> impl Future<Output = Result<Option<Identity>, NodeError>> + Send;

    /// Positional: one entry per requested hash.
    fn fetch_identities_by_public_key_hashes(
        &self,
        hashes: Vec<PublicKeyHash>,
    ) -> impl Future<Output = Result<Vec<Option<Identity>>, NodeError>> + Send;

    fn fetch_identity_ids_by_public_key_hashes(
        &self,
        hashes: Vec<PublicKeyHash>,
    ) -> impl Future<Output = Result<Vec<Option<Identifier>>, NodeError>> + Send;

    fn fetch_data_contract(&self, id: Identifier) -> impl Future<Output = Result<Option<DataContract>, NodeError>> + Send;

    fn fetch_documents(
        &self,
        contract_id: Identifier,
        document_type: String,
        query: DocumentQuery,
    ) -> impl Future<Output = Result<Vec<Document>, NodeError>> + Send;
}

impl<T: ChainObserver> ChainObserver for Arc<T> {
    fn confirmation_status(&self, tx_id: TxId) -> impl Future<Output = Result<ConfirmationStatus, NodeError>> + Send {
        (**self).confirmation_status(tx_id)
    }

    fn broadcast_transaction(&self, raw: Vec<u8>) -> impl Future<Output = Result<TxId, NodeError>> + Send {
        (**self).broadcast_transaction(raw)
    }

    fn address_balance(&self, address: String) -> impl Future<Output = Result<Duffs, NodeError>> + Send {
        (**self).address_balance(address)
    }
}
