// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod platform;

pub use platform::{PlatformState, TransitionOutcome};
