//! # claim-core
//!
//! Wallet-connection and signed-consolidation-request core for NIGHT claims:
//! - Registry of supported CIP-30 wallets with install probing
//! - Single-session wallet store with single-flight connect
//! - Address-keyed allocation snapshot queries
//! - Authorization message signing and consolidation submission

pub mod allocation;
pub mod backend;
mod client;
pub mod consolidation;
pub mod countdown;
pub mod error;
pub mod notice;
pub mod provider;
pub mod registry;
pub mod session;
pub mod settings;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use allocation::{AllocationService, AllocationSnapshot, AllocationStatus, AllocationView};
pub use backend::{BackendReply, ClaimBackend, DonateRequest, HttpBackend};
pub use client::ClaimClient;
pub use consolidation::{
    authorization_message, can_submit, encode_message, ConsolidationBuilder,
    ConsolidationRequest, ConsolidationResult,
};
pub use countdown::{Countdown, CountdownParts};
pub use error::{ClaimError, Result};
pub use notice::{LogNotices, Notice, NoticeLevel, NoticeSink, RecordingNotices};
pub use provider::{DataSignature, WalletConnector, WalletHandle, MAINNET_NETWORK_ID};
pub use registry::{EnableHook, InstallDetector, WalletDescriptor, WalletPartition, WalletRegistry};
pub use session::{SessionStore, WalletSession};
pub use settings::{Settings, SettingsManager};
