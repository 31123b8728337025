//! Error types for relaykit

use thiserror::Error;

/// Main error type for the toolkit
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Received non-OK HTTP status: {status}")]
    HttpStatus { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("no known gas price")]
    NoGasPrice,

    #[error("no known gas factor")]
    NoGasFactor,

    #[error("no chain found for chain ID")]
    NoChainFound,

    #[error("no fee tokens found in registry")]
    NoFeeToken,

    #[error("no staking tokens found in registry")]
    NoStakingToken,

    #[error("no matching asset found")]
    NoMatchingAsset,

    #[error("no matching denom found")]
    NoMatchingDenom,

    #[error("no denom units found for {denom}")]
    NoDenomUnits { denom: String },

    #[error("transaction {tx_hash} failed: {raw_log}")]
    TxFailed { tx_hash: String, raw_log: String },

    #[error("transaction status not found, consider increasing the gas fee")]
    TxStatusNotFound,

    #[error("operation cancelled")]
    Cancelled,
}

impl RelayError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::Transport(_) | RelayError::Http(_) | RelayError::HttpStatus { .. }
        )
    }

    /// Cancellation must never be retried
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RelayError::Cancelled)
    }
}

/// Result type for toolkit operations
pub type RelayResult<T> = Result<T, RelayError>;
