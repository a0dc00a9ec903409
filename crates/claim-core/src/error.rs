//! Error types for claim-core

use thiserror::Error;

/// Result type alias for claim operations
pub type Result<T> = std::result::Result<T, ClaimError>;

/// Claim error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    #[error("No wallet provider found")]
    NoProviderFound,

    #[error("Wallet connection was rejected by the user")]
    UserRejectedConnection,

    #[error("Wrong network: expected network id {expected}, wallet reports {actual}")]
    WrongNetwork { expected: u8, actual: u8 },

    #[error("Signing request was rejected: {0}")]
    SigningRejected(String),

    #[error("Wallet address {address} is not registered")]
    AllocationNotRegistered { address: String },

    #[error("Transport failure: {cause}")]
    TransportFailure { cause: String },

    #[error("Settlement service rejected the request ({status_code}): {message}")]
    SettlementRejected { status_code: u16, message: String },

    #[error("A wallet connection is already in progress")]
    ConnectInProgress,

    #[error("Connection superseded by a newer session change")]
    ConnectSuperseded,

    #[error("No wallet is connected")]
    NotConnected,

    #[error("No account address is set")]
    MissingAddress,

    #[error("Wallet provider error: {0}")]
    Provider(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClaimError {
    /// Whether this failure came from the wallet provider rather than the backend
    pub fn is_provider_interaction(&self) -> bool {
        matches!(
            self,
            ClaimError::NoProviderFound
                | ClaimError::UserRejectedConnection
                | ClaimError::WrongNetwork { .. }
                | ClaimError::SigningRejected(_)
        )
    }
}

impl From<std::io::Error> for ClaimError {
    fn from(err: std::io::Error) -> Self {
        ClaimError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClaimError {
    fn from(err: serde_json::Error) -> Self {
        ClaimError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ClaimError {
    fn from(err: reqwest::Error) -> Self {
        ClaimError::TransportFailure {
            cause: err.to_string(),
        }
    }
}
