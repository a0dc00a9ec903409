//! Scripted wallet providers

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::consolidation::{authorization_message, encode_message};
use crate::error::{ClaimError, Result};
use crate::provider::{DataSignature, WalletConnector, WalletHandle, MAINNET_NETWORK_ID};

/// Wallet handle with a fixed network, address and signing behaviour
pub struct ScriptedWallet {
    network_id: u8,
    address: String,
    reject_signing: bool,
    address_requests: AtomicUsize,
    signed: Mutex<Vec<String>>,
}

impl ScriptedWallet {
    /// Mainnet wallet that signs everything
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            network_id: MAINNET_NETWORK_ID,
            address: address.into(),
            reject_signing: false,
            address_requests: AtomicUsize::new(0),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn on_network(mut self, network_id: u8) -> Self {
        self.network_id = network_id;
        self
    }

    pub fn rejecting_signatures(mut self) -> Self {
        self.reject_signing = true;
        self
    }

    /// How many times the change address was requested
    pub fn address_requests(&self) -> usize {
        self.address_requests.load(Ordering::SeqCst)
    }

    /// Hex payloads passed to `sign_data`, in call order
    pub fn signed_payloads(&self) -> Vec<String> {
        self.signed.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Signature this wallet produces when authorizing `destination`
    pub fn signature_for(&self, destination: &str) -> String {
        Self::sign(&encode_message(&authorization_message(destination)))
    }

    fn sign(payload_hex: &str) -> String {
        format!("845846a201{}", payload_hex)
    }
}

#[async_trait]
impl WalletHandle for ScriptedWallet {
    async fn get_network_id(&self) -> Result<u8> {
        Ok(self.network_id)
    }

    async fn get_change_address(&self) -> Result<String> {
        self.address_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.address.clone())
    }

    async fn sign_data(&self, payload_hex: &str) -> Result<DataSignature> {
        if self.reject_signing {
            return Err(ClaimError::SigningRejected("user declined".to_string()));
        }
        if let Ok(mut signed) = self.signed.lock() {
            signed.push(payload_hex.to_string());
        }
        Ok(DataSignature {
            signature: Self::sign(payload_hex),
            key: "a401010327200621".to_string(),
        })
    }
}

#[derive(Clone)]
enum Behaviour {
    Wallet(Arc<ScriptedWallet>),
    Missing,
    Rejecting,
}

struct ConnectorState {
    behaviour: Mutex<Behaviour>,
    enabled: Mutex<Vec<String>>,
    calls: AtomicUsize,
    gate: Option<Notify>,
}

/// Connector whose `enable` outcome is scripted
///
/// A gated connector parks every `enable` call until [`open_gate`](Self::open_gate).
#[derive(Clone)]
pub struct ScriptedConnector {
    state: Arc<ConnectorState>,
}

impl ScriptedConnector {
    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            state: Arc::new(ConnectorState {
                behaviour: Mutex::new(behaviour),
                enabled: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                gate: None,
            }),
        }
    }

    pub fn with_wallet(wallet: Arc<ScriptedWallet>) -> Self {
        Self::with_behaviour(Behaviour::Wallet(wallet))
    }

    /// No extension injected
    pub fn missing() -> Self {
        Self::with_behaviour(Behaviour::Missing)
    }

    /// User declines every connection
    pub fn rejecting() -> Self {
        Self::with_behaviour(Behaviour::Rejecting)
    }

    /// Park `enable` calls until the gate opens; call before cloning
    pub fn gated(self) -> Self {
        let state = match Arc::try_unwrap(self.state) {
            Ok(state) => state,
            Err(_) => panic!("gated() must be called before the connector is shared"),
        };
        Self {
            state: Arc::new(ConnectorState {
                gate: Some(Notify::new()),
                ..state
            }),
        }
    }

    pub fn set_wallet(&self, wallet: Arc<ScriptedWallet>) {
        if let Ok(mut behaviour) = self.state.behaviour.lock() {
            *behaviour = Behaviour::Wallet(wallet);
        }
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.state.gate {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Provider ids passed to `enable` that got past the gate
    pub fn enabled_ids(&self) -> Vec<String> {
        self.state
            .enabled
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Yield until at least `n` `enable` calls have started
    pub async fn wait_for_enable_calls(&self, n: usize) {
        while self.state.calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl WalletConnector for ScriptedConnector {
    async fn enable(&self, provider_id: &str) -> Result<Arc<dyn WalletHandle>> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.state.gate {
            gate.notified().await;
        }

        let behaviour = self
            .state
            .behaviour
            .lock()
            .map(|b| b.clone())
            .map_err(|_| ClaimError::Provider("connector state poisoned".to_string()))?;

        match behaviour {
            Behaviour::Wallet(wallet) => {
                if let Ok(mut enabled) = self.state.enabled.lock() {
                    enabled.push(provider_id.to_string());
                }
                Ok(wallet as Arc<dyn WalletHandle>)
            }
            Behaviour::Missing => Err(ClaimError::NoProviderFound),
            Behaviour::Rejecting => Err(ClaimError::UserRejectedConnection),
        }
    }
}
