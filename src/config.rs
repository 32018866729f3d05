// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

use crate::types::Credits;

/// Fixed conversion rate applied to asset-locked outputs.
pub const CREDITS_PER_DUFF: Credits = 1000;

/// Default storage cost of one byte of serialized batch payload.
pub const DEFAULT_CREDITS_PER_BYTE: Credits = 5_000;

/// Default processing cost of a single create/replace/delete.
pub const DEFAULT_CREDITS_PER_OPERATION: Credits = 10_000;

pub const MAX_DOCUMENT_TYPE_NAME_LEN: usize = 64;

pub const MAX_INDEX_PROPERTIES: usize = 10;

/// Public keys accepted in a single identity create.
pub const MAX_PUBLIC_KEYS: usize = 32;
