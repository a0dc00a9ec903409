//! Wallet provider capability traits
//!
//! Mirrors the CIP-30 surface a browser wallet extension injects: a connector
//! that enables a named wallet, and the handle it returns once enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

/// Network id reported by wallets connected to Cardano mainnet
pub const MAINNET_NETWORK_ID: u8 = 1;

/// Output of a `signData` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSignature {
    /// COSE_Sign1 signature, hex encoded
    pub signature: String,
    /// COSE_Key of the signing key, hex encoded
    #[serde(default)]
    pub key: String,
}

/// An enabled wallet
#[async_trait]
pub trait WalletHandle: Send + Sync {
    /// Network the wallet is currently connected to
    async fn get_network_id(&self) -> Result<u8>;

    /// Change (primary) address of the active account
    async fn get_change_address(&self) -> Result<String>;

    /// Sign a hex-encoded payload with the account key
    async fn sign_data(&self, payload_hex: &str) -> Result<DataSignature>;
}

/// Entry point that enables wallets by provider id
///
/// Implementations return [`ClaimError::NoProviderFound`](crate::ClaimError::NoProviderFound)
/// when nothing is injected for the id and
/// [`ClaimError::UserRejectedConnection`](crate::ClaimError::UserRejectedConnection)
/// when the user declines in the wallet UI.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn enable(&self, provider_id: &str) -> Result<Arc<dyn WalletHandle>>;
}
