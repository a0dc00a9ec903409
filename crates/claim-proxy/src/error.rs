//! Error types for claim-proxy

use thiserror::Error;

/// Proxy error types
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid settlement URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] claim_core::ClaimError),
}
