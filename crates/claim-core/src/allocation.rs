//! Allocation snapshot queries and the address-keyed allocation view

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::ClaimBackend;
use crate::error::{ClaimError, Result};
use crate::notice::{Notice, NoticeSink};
use crate::session::WalletSession;

/// Smallest units per whole NIGHT
pub const UNITS_PER_NIGHT: u64 = 1_000_000;

/// Allocation of one account as reported by the settlement service
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSnapshot {
    /// Allocation in smallest units
    pub allocation_amount: u64,
    /// Estimated share of the pool, in percent
    pub estimated_share: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Integer(v) => Some(*v as f64),
            Numeric::Float(v) => Some(*v),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_units(&self) -> Option<u64> {
        match self {
            Numeric::Integer(v) => Some(*v),
            Numeric::Text(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .or_else(|| self.as_f64().map(|f| f.max(0.0).round() as u64)),
            Numeric::Float(f) => Some(f.max(0.0).round() as u64),
        }
    }
}

#[derive(Deserialize, Default)]
struct LocalStatistics {
    #[serde(default)]
    night_allocation: Option<Numeric>,
}

#[derive(Deserialize)]
struct StatisticsBody {
    #[serde(default)]
    local: Option<LocalStatistics>,
    #[serde(default, rename = "estimatedShare")]
    estimated_share: Option<Numeric>,
}

impl AllocationSnapshot {
    /// Parse the settlement service's statistics body
    pub fn from_statistics(body: &Value) -> Result<Self> {
        let parsed = StatisticsBody::deserialize(body)?;

        let allocation_amount = match parsed.local.and_then(|l| l.night_allocation) {
            Some(value) => value.as_units().ok_or_else(|| {
                ClaimError::Serialization("night_allocation is not numeric".to_string())
            })?,
            None => 0,
        };

        let estimated_share = match parsed.estimated_share {
            Some(value) => value.as_f64().ok_or_else(|| {
                ClaimError::Serialization("estimatedShare is not numeric".to_string())
            })?,
            None => 0.0,
        };

        Ok(Self {
            allocation_amount,
            estimated_share,
        })
    }

    /// Allocation in whole NIGHT
    pub fn night(&self) -> f64 {
        self.allocation_amount as f64 / UNITS_PER_NIGHT as f64
    }

    pub fn is_empty(&self) -> bool {
        self.allocation_amount == 0 && self.estimated_share == 0.0
    }

    /// e.g. "344.7761 NIGHT"
    pub fn display_amount(&self) -> String {
        format!("{:.4} NIGHT", self.night())
    }

    /// e.g. "0.00005464%"
    pub fn display_share(&self) -> String {
        if self.estimated_share == 0.0 {
            "0.0000%".to_string()
        } else {
            format!("{}%", self.estimated_share)
        }
    }
}

/// Fetches allocation snapshots from the backend
#[derive(Clone)]
pub struct AllocationService {
    backend: Arc<dyn ClaimBackend>,
}

impl AllocationService {
    pub fn new(backend: Arc<dyn ClaimBackend>) -> Self {
        Self { backend }
    }

    /// Fetch the snapshot for `address` with a single backend round trip
    pub async fn fetch_allocation(&self, address: &str) -> Result<AllocationSnapshot> {
        if address.trim().is_empty() {
            return Err(ClaimError::MissingAddress);
        }

        let reply = self.backend.statistics(address).await?;

        if reply.is_success() {
            return AllocationSnapshot::from_statistics(&reply.body);
        }

        if reply.status == 404 {
            return Err(ClaimError::AllocationNotRegistered {
                address: address.to_string(),
            });
        }

        Err(ClaimError::SettlementRejected {
            status_code: reply.status,
            message: reply
                .error_message()
                .unwrap_or_else(|| "Failed to fetch allocation".to_string()),
        })
    }
}

/// What the allocation panel shows
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationStatus {
    /// No address selected
    Idle,
    /// Fetch in flight for the selected address
    Loading,
    Ready(AllocationSnapshot),
    /// Last fetch failed; render zero defaults
    NoData,
}

impl AllocationStatus {
    /// Snapshot to render; zero unless a fetch succeeded
    pub fn snapshot(&self) -> AllocationSnapshot {
        match self {
            AllocationStatus::Ready(snapshot) => *snapshot,
            _ => AllocationSnapshot::default(),
        }
    }
}

struct ViewState {
    address: Option<String>,
    generation: u64,
    status: AllocationStatus,
}

/// Allocation state keyed by the selected address
///
/// A result is committed only if the address and generation it was fetched
/// for are still current, so the latest selection always wins.
pub struct AllocationView {
    service: AllocationService,
    notices: Arc<dyn NoticeSink>,
    state: Mutex<ViewState>,
}

impl AllocationView {
    pub fn new(service: AllocationService, notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            service,
            notices,
            state: Mutex::new(ViewState {
                address: None,
                generation: 0,
                status: AllocationStatus::Idle,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> AllocationStatus {
        self.lock().status.clone()
    }

    pub fn address(&self) -> Option<String> {
        self.lock().address.clone()
    }

    /// Re-key the view; returns whether the address changed
    pub fn select(&self, address: Option<String>) -> bool {
        let address = address.filter(|a| !a.trim().is_empty());
        let mut state = self.lock();
        if state.address == address {
            return false;
        }

        state.generation += 1;
        state.status = match address {
            Some(_) => AllocationStatus::Loading,
            None => AllocationStatus::Idle,
        };
        debug!("Allocation view keyed to {:?}", address);
        state.address = address;
        true
    }

    /// Fetch for the current address and commit unless superseded
    pub async fn refresh(&self) -> AllocationStatus {
        let (address, generation) = {
            let mut state = self.lock();
            let Some(address) = state.address.clone() else {
                return AllocationStatus::Idle;
            };
            state.status = AllocationStatus::Loading;
            (address, state.generation)
        };

        let result = self.service.fetch_allocation(&address).await;

        let mut state = self.lock();
        if state.generation != generation || state.address.as_deref() != Some(address.as_str()) {
            debug!("Discarding stale allocation result for {}", address);
            return state.status.clone();
        }

        state.status = match result {
            Ok(snapshot) => {
                info!("Allocation for {}: {}", address, snapshot.display_amount());
                AllocationStatus::Ready(snapshot)
            }
            Err(e) => {
                warn!("Allocation fetch for {} failed: {}", address, e);
                let message = match e {
                    ClaimError::AllocationNotRegistered { .. } => {
                        format!("Wallet address {} is not registered", address)
                    }
                    other => format!("Failed to load allocation for {}: {}", address, other),
                };
                self.notices.notify(Notice::error(message));
                AllocationStatus::NoData
            }
        };
        state.status.clone()
    }

    /// Select `address` and fetch it
    pub async fn show(&self, address: Option<String>) -> AllocationStatus {
        self.select(address);
        self.refresh().await
    }

    /// Track session changes until the store is dropped
    ///
    /// Each address change spawns its own fetch; stale fetches are discarded
    /// on commit.
    pub async fn follow(self: Arc<Self>, mut sessions: watch::Receiver<Option<WalletSession>>) {
        loop {
            let address = sessions
                .borrow_and_update()
                .as_ref()
                .map(|s| s.account_address().to_string());

            if self.select(address) {
                let view = self.clone();
                tokio::spawn(async move {
                    view.refresh().await;
                });
            }

            if sessions.changed().await.is_err() {
                debug!("Session store dropped, allocation view stops following");
                break;
            }
        }
    }
}
