// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! platform-kernel: A deterministic identity, credit and document state machine.
//!
//! Funded core-chain outputs become identities and credits through asset-lock
//! proofs; credits pay for schema-validated, revision-tracked document
//! mutations. Everything here is synchronous and free of I/O.

pub mod config;
pub mod error;
pub mod types;
pub mod asset_lock;
pub mod identity;
pub mod contract;
pub mod document;
pub mod cost;
pub mod transition;
pub mod state;
pub mod verify;

#[cfg(test)]
pub mod tests;
