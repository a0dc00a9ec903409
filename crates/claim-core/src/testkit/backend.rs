//! In-memory backend

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::backend::{BackendReply, ClaimBackend, DonateRequest};
use crate::error::{ClaimError, Result};

#[derive(Default)]
struct StubState {
    statistics: HashMap<String, BackendReply>,
    gates: HashMap<String, Arc<Notify>>,
    donate: Option<BackendReply>,
    statistics_calls: Vec<String>,
    donate_calls: Vec<DonateRequest>,
}

/// Backend answering from scripted replies
///
/// Unscripted addresses and an unscripted donate reply fail with
/// [`ClaimError::TransportFailure`].
#[derive(Default)]
pub struct StubBackend {
    state: Mutex<StubState>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut StubState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }

    pub fn set_statistics(&self, address: &str, reply: BackendReply) {
        self.with_state(|s| {
            s.statistics.insert(address.to_string(), reply);
        });
    }

    pub fn set_donate(&self, reply: BackendReply) {
        self.with_state(|s| s.donate = Some(reply));
    }

    /// Hold statistics calls for `address` until the returned notify fires
    pub fn gate(&self, address: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.with_state(|s| {
            s.gates.insert(address.to_string(), gate.clone());
        });
        gate
    }

    pub fn statistics_calls(&self) -> Vec<String> {
        self.with_state(|s| s.statistics_calls.clone())
    }

    pub fn donate_calls(&self) -> Vec<DonateRequest> {
        self.with_state(|s| s.donate_calls.clone())
    }

    /// Yield until at least `n` statistics calls have started
    pub async fn wait_for_statistics_calls(&self, n: usize) {
        while self.with_state(|s| s.statistics_calls.len()) < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ClaimBackend for StubBackend {
    async fn statistics(&self, address: &str) -> Result<BackendReply> {
        let gate = self.with_state(|s| {
            s.statistics_calls.push(address.to_string());
            s.gates.get(address).cloned()
        });

        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.with_state(|s| s.statistics.get(address).cloned())
            .ok_or_else(|| ClaimError::TransportFailure {
                cause: format!("no route to statistics for {}", address),
            })
    }

    async fn donate(&self, request: &DonateRequest) -> Result<BackendReply> {
        self.with_state(|s| {
            s.donate_calls.push(request.clone());
            s.donate.clone()
        })
        .ok_or_else(|| ClaimError::TransportFailure {
            cause: "connection refused".to_string(),
        })
    }
}
