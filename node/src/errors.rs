// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use platform_kernel::error::KernelError;
use platform_kernel::types::TxId;

/// gRPC-style status codes carried by remote rejections.
pub mod codes {
    pub const INVALID_ARGUMENT: u32 = 3;
    pub const FAILED_PRECONDITION: u32 = 9;
    pub const UNAVAILABLE: u32 = 14;
}

/// One consensus error as reported by the remote validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

#[derive(Error, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[error("remote validation failed ({code}): {details}")]
pub struct RemoteValidationError {
    pub code: u32,
    pub details: String,
    pub errors: Vec<ConsensusErrorInfo>,
}

impl RemoteValidationError {
    /// Wire form of a kernel rejection.
    pub fn from_kernel(err: &KernelError) -> Self {
        let info = ConsensusErrorInfo {
            name: err.consensus_name().to_string(),
            message: err.to_string(),
            extra: err.extra(),
        };
        let (code, details) = match err {
            KernelError::InsufficientCredits { .. } => {
                (codes::FAILED_PRECONDITION, "Failed precondition: Not enough credits")
            }
            _ => (codes::INVALID_ARGUMENT, "State Transition is invalid"),
        };
        Self { code, details: details.to_string(), errors: vec![info] }
    }

    pub fn first_error_name(&self) -> Option<&str> {
        self.errors.first().map(|e| e.name.as_str())
    }
}

#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    #[error(transparent)]
    Rejected(#[from] RemoteValidationError),
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("no instant or chain lock observed for transaction {tx_id}")]
    ProofUnavailable { tx_id: TxId },
    #[error("condition not met after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Codec error: {0}")]
    Codec(String),
}

impl NodeError {
    /// Only transport failures are worth retrying; rejected transitions are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::Remote(RemoteError::Unavailable(_)))
    }

    pub fn remote_validation(&self) -> Option<&RemoteValidationError> {
        match self {
            NodeError::Remote(RemoteError::Rejected(e)) => Some(e),
            _ => None,
        }
    }

    /// Consensus error name, whether raised locally or remotely.
    pub fn consensus_name(&self) -> Option<&str> {
        match self {
            NodeError::Kernel(e) => Some(e.consensus_name()),
            other => other.remote_validation().and_then(|e| e.first_error_name()),
        }
    }
}

impl From<RemoteValidationError> for NodeError {
    fn from(e: RemoteValidationError) -> Self {
        NodeError::Remote(RemoteError::Rejected(e))
    }
}
