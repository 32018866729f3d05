// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Credit cost of document batches.

use core::fmt::Debug;

use crate::config::{DEFAULT_CREDITS_PER_BYTE, DEFAULT_CREDITS_PER_OPERATION};
use crate::types::Credits;

/// Deterministic pricing of a documents batch.
pub trait CostPolicy: Debug + Send + Sync {
    /// `payload_len` is the serialized batch size in bytes.
    fn batch_cost(&self, payload_len: usize, operations: usize) -> Credits;
}

/// Linear in payload bytes plus a flat fee per operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeCostPolicy {
    pub credits_per_byte: Credits,
    pub credits_per_operation: Credits,
}

impl SizeCostPolicy {
    pub fn new(credits_per_byte: Credits, credits_per_operation: Credits) -> Self {
        Self { credits_per_byte, credits_per_operation }
    }

    pub fn free() -> Self {
        Self::new(0, 0)
    }
}

impl Default for SizeCostPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CREDITS_PER_BYTE, DEFAULT_CREDITS_PER_OPERATION)
    }
}

impl CostPolicy for SizeCostPolicy {
    fn batch_cost(&self, payload_len: usize, operations: usize) -> Credits {
        (payload_len as Credits)
            .saturating_mul(self.credits_per_byte)
            .saturating_add((operations as Credits).saturating_mul(self.credits_per_operation))
    }
}
