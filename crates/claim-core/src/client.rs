//! Claim client orchestration
//!
//! Wires the registry, session store, allocation view and consolidation
//! builder together the way the claim page drives them.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::allocation::{AllocationService, AllocationStatus, AllocationView};
use crate::backend::{ClaimBackend, HttpBackend};
use crate::consolidation::{can_submit, ConsolidationBuilder, ConsolidationResult};
use crate::countdown::Countdown;
use crate::error::{ClaimError, Result};
use crate::notice::{Notice, NoticeSink};
use crate::provider::WalletConnector;
use crate::registry::{WalletPartition, WalletRegistry};
use crate::session::SessionStore;
use crate::settings::Settings;

/// Everything a claim page needs, behind one handle
pub struct ClaimClient {
    registry: WalletRegistry,
    sessions: Arc<SessionStore>,
    allocation: Arc<AllocationView>,
    consolidation: ConsolidationBuilder,
    notices: Arc<dyn NoticeSink>,
    settings: Settings,
}

impl ClaimClient {
    pub fn new(
        settings: Settings,
        registry: WalletRegistry,
        connector: Arc<dyn WalletConnector>,
        backend: Arc<dyn ClaimBackend>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::with_network(
            connector,
            notices.clone(),
            settings.expected_network_id,
        ));
        let allocation = Arc::new(AllocationView::new(
            AllocationService::new(backend.clone()),
            notices.clone(),
        ));
        let consolidation = ConsolidationBuilder::new(backend, notices.clone());

        Self {
            registry,
            sessions,
            allocation,
            consolidation,
            notices,
            settings,
        }
    }

    /// Client talking to the proxy at `settings.proxy_url`
    pub fn from_settings(
        settings: Settings,
        registry: WalletRegistry,
        connector: Arc<dyn WalletConnector>,
        notices: Arc<dyn NoticeSink>,
    ) -> Result<Self> {
        settings.validate()?;
        let backend = HttpBackend::new(&settings.proxy_url, settings.request_timeout())?;
        info!("Claim client using proxy at {}", backend.base_url());
        Ok(Self::new(
            settings,
            registry,
            connector,
            Arc::new(backend),
            notices,
        ))
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Probe the registry for installed wallets
    pub async fn available_wallets(&self) -> WalletPartition {
        self.registry.partition().await
    }

    /// Connect the wallet with `wallet_id` and load its allocation
    pub async fn connect(&self, wallet_id: &str) -> Result<String> {
        let Some(descriptor) = self.registry.get(wallet_id) else {
            warn!("Unknown wallet {}", wallet_id);
            self.notices.notify(Notice::error("Failed to connect wallet"));
            return Err(ClaimError::NoProviderFound);
        };

        let address = self.sessions.connect(descriptor).await?;
        self.refresh_allocation().await;
        Ok(address)
    }

    pub fn disconnect(&self) {
        self.sessions.disconnect();
        self.allocation.select(None);
    }

    /// Re-key the allocation view to the current session and fetch
    pub async fn refresh_allocation(&self) -> AllocationStatus {
        self.allocation.show(self.sessions.address()).await
    }

    pub fn allocation(&self) -> AllocationStatus {
        self.allocation.status()
    }

    /// Keep the allocation view in step with session changes made elsewhere
    pub fn track_sessions(&self) -> JoinHandle<()> {
        let view = self.allocation.clone();
        let sessions = self.sessions.subscribe();
        tokio::spawn(view.follow(sessions))
    }

    pub fn can_submit(&self, destination: &str) -> bool {
        can_submit(self.sessions.session().as_ref(), destination)
    }

    /// Sign and submit; `None` when the submit control is disabled
    pub async fn submit(&self, destination: &str) -> Option<ConsolidationResult> {
        self.consolidation
            .submit_with(&self.sessions, destination)
            .await
    }

    /// Countdown to the configured claim deadline, if any
    pub fn countdown(&self) -> Option<Countdown> {
        self.settings
            .claim_deadline
            .map(|deadline| Countdown::until(deadline, chrono::Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendReply;
    use crate::notice::RecordingNotices;
    use crate::testkit::{ScriptedConnector, ScriptedWallet, StubBackend};
    use serde_json::json;

    const ADDRESS: &str = "addr1qclient";

    fn client(backend: Arc<StubBackend>) -> ClaimClient {
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        ClaimClient::new(
            Settings::default(),
            WalletRegistry::cardano(),
            Arc::new(ScriptedConnector::with_wallet(wallet)),
            backend,
            Arc::new(RecordingNotices::new()),
        )
    }

    #[tokio::test]
    async fn test_connect_loads_allocation() {
        let backend = Arc::new(StubBackend::new());
        backend.set_statistics(
            ADDRESS,
            BackendReply::new(200, json!({"local": {"night_allocation": 3_000_000}})),
        );
        let client = client(backend);

        client.connect("eternl").await.unwrap();

        assert_eq!(client.allocation().snapshot().allocation_amount, 3_000_000);
        assert!(client.can_submit("addr1qdest"));

        client.disconnect();
        assert_eq!(client.allocation(), AllocationStatus::Idle);
        assert!(!client.can_submit("addr1qdest"));
        assert!(client.submit("addr1qdest").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_wallet() {
        let client = client(Arc::new(StubBackend::new()));
        assert_eq!(
            client.connect("metamask").await.unwrap_err(),
            ClaimError::NoProviderFound
        );
        assert!(!client.sessions().is_connected());
    }

    #[tokio::test]
    async fn test_track_sessions_follows_store() {
        let backend = Arc::new(StubBackend::new());
        backend.set_statistics(
            ADDRESS,
            BackendReply::new(200, json!({"local": {"night_allocation": 9_000_000}})),
        );
        let client = client(backend.clone());
        let tracker = client.track_sessions();

        let descriptor = client.registry().get("lace").unwrap().clone();
        client.sessions().connect(&descriptor).await.unwrap();

        while client.allocation().snapshot().allocation_amount == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.statistics_calls(), vec![ADDRESS.to_string()]);

        client.sessions().disconnect();
        while client.allocation() != AllocationStatus::Idle {
            tokio::task::yield_now().await;
        }

        tracker.abort();
    }

    #[test]
    fn test_countdown_requires_deadline() {
        let client = client(Arc::new(StubBackend::new()));
        assert!(client.countdown().is_none());
    }
}
