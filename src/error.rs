//! Error types for the escrow engine
//!
//! Every rejected operation surfaces one of these variants to the caller;
//! nothing is retried internally and nothing is swallowed. `TransferFailed`
//! always leaves the engagement state unchanged.

use thiserror::Error;
use uuid::Uuid;

use crate::ledger::TransferError;
use crate::models::EscrowState;

/// Main error type for escrow operations
#[derive(Error, Debug)]
pub enum EscrowError {
    /// Caller is not permitted to invoke this operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Operation is not valid from the engagement's current state
    #[error("invalid state: {operation} is not allowed from {from}: {reason}")]
    InvalidState {
        operation: String,
        from: String,
        reason: String,
    },

    /// Malformed input, e.g. a zero amount or an out-of-range split
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The value-transfer substrate could not complete the debit/credit
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// Unknown engagement identifier
    #[error("engagement {0} not found")]
    NotFound(Uuid),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EscrowError {
    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(operation: &str, from: EscrowState, reason: &str) -> Self {
        Self::InvalidState {
            operation: operation.to_string(),
            from: format!("{from:?}"),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
