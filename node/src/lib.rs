// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! platform-node: async host for the platform kernel.
//!
//! Drives identity, contract and document flows against a core chain and a
//! platform endpoint, absorbing the lag between an accepted broadcast and
//! its visibility in reads.

pub mod config;
pub mod errors;
pub mod telemetry;
pub mod chain;
pub mod reconciler;
pub mod prover;
pub mod local;
pub mod client;

pub use client::PlatformClient;
pub use config::NodeConfig;
pub use errors::NodeError;
pub use local::LocalNetwork;
