//! Wallet session store
//!
//! Holds at most one connected wallet. `connect` is single-flight: a second
//! call while one is pending is rejected, never queued. Every change is
//! published on a watch channel so dependent views can re-key themselves.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{ClaimError, Result};
use crate::notice::{Notice, NoticeSink};
use crate::provider::{WalletConnector, WalletHandle, MAINNET_NETWORK_ID};
use crate::registry::WalletDescriptor;

/// A connected wallet: enabled handle, its account address and catalog entry
#[derive(Clone)]
pub struct WalletSession {
    handle: Arc<dyn WalletHandle>,
    account_address: String,
    descriptor: WalletDescriptor,
}

impl WalletSession {
    pub fn handle(&self) -> &Arc<dyn WalletHandle> {
        &self.handle
    }

    pub fn account_address(&self) -> &str {
        &self.account_address
    }

    pub fn descriptor(&self) -> &WalletDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("account_address", &self.account_address)
            .field("wallet", &self.descriptor.id)
            .finish()
    }
}

struct SessionState {
    session: Option<WalletSession>,
    /// Bumped on every commit or disconnect; a pending connect that observes
    /// a different epoch at commit time is discarded.
    epoch: u64,
}

/// Releases the connect slot when dropped, including on cancellation
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the single wallet session
///
/// `sessions` is only written while the `state` lock is held, so subscribers
/// observe changes in commit order.
pub struct SessionStore {
    connector: Arc<dyn WalletConnector>,
    notices: Arc<dyn NoticeSink>,
    expected_network_id: u8,
    state: watch::Sender<SessionState>,
    sessions: watch::Sender<Option<WalletSession>>,
    connecting: AtomicBool,
}

impl SessionStore {
    /// Create a store that accepts mainnet wallets only
    pub fn new(connector: Arc<dyn WalletConnector>, notices: Arc<dyn NoticeSink>) -> Self {
        Self::with_network(connector, notices, MAINNET_NETWORK_ID)
    }

    /// Create a store that accepts wallets on the given network id
    pub fn with_network(
        connector: Arc<dyn WalletConnector>,
        notices: Arc<dyn NoticeSink>,
        expected_network_id: u8,
    ) -> Self {
        let (state, _) = watch::channel(SessionState {
            session: None,
            epoch: 0,
        });
        let (sessions, _) = watch::channel(None);

        Self {
            connector,
            notices,
            expected_network_id,
            state,
            sessions,
            connecting: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Option<WalletSession> {
        self.state.borrow().session.clone()
    }

    /// Account address of the current session
    pub fn address(&self) -> Option<String> {
        self.state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.account_address.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().session.is_some()
    }

    /// Whether a connect is currently pending
    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<Option<WalletSession>> {
        self.sessions.subscribe()
    }

    /// Connect the described wallet, returning its account address
    ///
    /// On failure the previous session is left untouched and a notice is
    /// emitted for provider-interaction errors; other errors are only logged.
    pub async fn connect(&self, descriptor: &WalletDescriptor) -> Result<String> {
        let Some(_guard) = FlightGuard::acquire(&self.connecting) else {
            warn!("Connect to {} rejected: another connect is pending", descriptor.id);
            self.notices
                .notify(Notice::error("A wallet connection is already in progress"));
            return Err(ClaimError::ConnectInProgress);
        };

        let epoch = self.state.borrow().epoch;
        info!("Connecting wallet {}", descriptor.id);

        let session = match self.establish(descriptor).await {
            Ok(session) => session,
            Err(e) => {
                self.report_failure(descriptor, &e);
                return Err(e);
            }
        };

        let address = session.account_address.clone();
        let committed = self.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            state.epoch += 1;
            state.session = Some(session.clone());
            self.sessions.send_replace(Some(session.clone()));
            true
        });

        if !committed {
            warn!("Discarding connect to {}: session changed while pending", descriptor.id);
            return Err(ClaimError::ConnectSuperseded);
        }

        info!("Connected wallet {} with address {}", descriptor.id, address);
        self.notices.notify(Notice::success("Wallet connected successfully"));
        Ok(address)
    }

    /// Clear the session; a no-op success when nothing is connected
    pub fn disconnect(&self) {
        let had_session = self.state.send_if_modified(|state| {
            state.epoch += 1;
            let had_session = state.session.take().is_some();
            if had_session {
                self.sessions.send_replace(None);
            }
            had_session
        });

        if had_session {
            info!("Wallet disconnected");
        } else {
            debug!("Disconnect with no active session");
        }
        self.notices.notify(Notice::success("Wallet disconnected successfully"));
    }

    async fn establish(&self, descriptor: &WalletDescriptor) -> Result<WalletSession> {
        if let Some(hook) = descriptor.enable_hook() {
            debug!("Running enable hook for {}", descriptor.id);
            hook.before_enable().await?;
        }

        let handle = self.connector.enable(&descriptor.id.to_lowercase()).await?;

        let network_id = handle.get_network_id().await?;
        if network_id != self.expected_network_id {
            return Err(ClaimError::WrongNetwork {
                expected: self.expected_network_id,
                actual: network_id,
            });
        }

        let account_address = handle.get_change_address().await?;
        if account_address.is_empty() {
            return Err(ClaimError::Provider(
                "wallet returned an empty change address".to_string(),
            ));
        }

        Ok(WalletSession {
            handle,
            account_address,
            descriptor: descriptor.clone(),
        })
    }

    fn report_failure(&self, descriptor: &WalletDescriptor, err: &ClaimError) {
        match err {
            ClaimError::NoProviderFound => {
                warn!("No provider injected for {}", descriptor.id);
                self.notices.notify(Notice::error("Failed to connect wallet"));
            }
            ClaimError::UserRejectedConnection => {
                info!("User rejected connection to {}", descriptor.id);
                self.notices
                    .notify(Notice::error("Wallet connection was rejected"));
            }
            ClaimError::WrongNetwork { expected, actual } => {
                warn!(
                    "Wallet {} is on network {} (expected {})",
                    descriptor.id, actual, expected
                );
                self.notices.notify(Notice::error(
                    "Invalid network, please switch to mainnet network",
                ));
            }
            other => {
                error!("Connecting wallet {} failed: {}", descriptor.id, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::{NoticeLevel, RecordingNotices};
    use crate::testkit::{ScriptedConnector, ScriptedWallet};

    const ADDRESS: &str = "addr1qxyconnected";

    fn store_with(connector: ScriptedConnector) -> (SessionStore, Arc<RecordingNotices>) {
        let notices = Arc::new(RecordingNotices::new());
        let store = SessionStore::new(Arc::new(connector), notices.clone());
        (store, notices)
    }

    fn eternl() -> WalletDescriptor {
        WalletDescriptor::new("Eternl", "Eternl")
    }

    #[tokio::test]
    async fn test_connect_sets_session() {
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        let connector = ScriptedConnector::with_wallet(wallet);
        let (store, notices) = store_with(connector.clone());

        let address = store.connect(&eternl()).await.unwrap();

        assert_eq!(address, ADDRESS);
        assert!(store.is_connected());
        assert_eq!(store.address().as_deref(), Some(ADDRESS));
        assert_eq!(store.session().unwrap().descriptor().id, "Eternl");
        assert_eq!(connector.enabled_ids(), vec!["eternl".to_string()]);
        assert_eq!(notices.last().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_connect_without_provider_is_noop() {
        let (store, notices) = store_with(ScriptedConnector::missing());

        let err = store.connect(&eternl()).await.unwrap_err();

        assert_eq!(err, ClaimError::NoProviderFound);
        assert!(!store.is_connected());
        assert_eq!(notices.last().unwrap(), Notice::error("Failed to connect wallet"));
    }

    #[tokio::test]
    async fn test_connect_rejected_by_user_is_noop() {
        let (store, notices) = store_with(ScriptedConnector::rejecting());

        let err = store.connect(&eternl()).await.unwrap_err();

        assert_eq!(err, ClaimError::UserRejectedConnection);
        assert!(store.session().is_none());
        assert_eq!(notices.with_level(NoticeLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_network_is_noop_and_skips_address() {
        for network in [0u8, 2] {
            let wallet = Arc::new(ScriptedWallet::new(ADDRESS).on_network(network));
            let (store, notices) = store_with(ScriptedConnector::with_wallet(wallet.clone()));

            let err = store.connect(&eternl()).await.unwrap_err();

            assert_eq!(
                err,
                ClaimError::WrongNetwork {
                    expected: 1,
                    actual: network
                }
            );
            assert!(!store.is_connected());
            assert_eq!(wallet.address_requests(), 0);
            assert_eq!(
                notices.last().unwrap().message,
                "Invalid network, please switch to mainnet network"
            );
        }
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_previous_session() {
        let first = Arc::new(ScriptedWallet::new(ADDRESS));
        let connector = ScriptedConnector::with_wallet(first);
        let (store, _notices) = store_with(connector.clone());
        store.connect(&eternl()).await.unwrap();

        connector.set_wallet(Arc::new(ScriptedWallet::new("addr1qother").on_network(0)));
        assert!(store.connect(&eternl()).await.is_err());

        assert_eq!(store.address().as_deref(), Some(ADDRESS));
    }

    #[tokio::test]
    async fn test_unexpected_provider_error_is_logged_only() {
        let wallet = Arc::new(ScriptedWallet::new(""));
        let (store, notices) = store_with(ScriptedConnector::with_wallet(wallet));

        let err = store.connect(&eternl()).await.unwrap_err();

        assert!(matches!(err, ClaimError::Provider(_)));
        assert!(!store.is_connected());
        assert!(notices.all().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_clears_session() {
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        let (store, notices) = store_with(ScriptedConnector::with_wallet(wallet));
        store.connect(&eternl()).await.unwrap();

        store.disconnect();

        assert!(!store.is_connected());
        assert!(store.address().is_none());
        assert_eq!(
            notices.last().unwrap(),
            Notice::success("Wallet disconnected successfully")
        );
    }

    #[tokio::test]
    async fn test_disconnect_without_session() {
        let (store, notices) = store_with(ScriptedConnector::missing());

        store.disconnect();
        store.disconnect();

        assert!(!store.is_connected());
        assert_eq!(notices.with_level(NoticeLevel::Success).len(), 2);
    }

    #[tokio::test]
    async fn test_second_connect_while_pending_is_rejected() {
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        let connector = ScriptedConnector::with_wallet(wallet).gated();
        let (store, _notices) = store_with(connector.clone());
        let store = Arc::new(store);

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.connect(&eternl()).await })
        };
        connector.wait_for_enable_calls(1).await;
        assert!(store.is_connecting());

        let second = store.connect(&eternl()).await;
        assert_eq!(second.unwrap_err(), ClaimError::ConnectInProgress);

        connector.open_gate();
        assert_eq!(pending.await.unwrap().unwrap(), ADDRESS);
        assert!(!store.is_connecting());
        assert_eq!(connector.enabled_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_supersedes_pending_connect() {
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        let connector = ScriptedConnector::with_wallet(wallet).gated();
        let (store, _notices) = store_with(connector.clone());
        let store = Arc::new(store);

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.connect(&eternl()).await })
        };
        connector.wait_for_enable_calls(1).await;

        store.disconnect();
        connector.open_gate();

        assert_eq!(pending.await.unwrap().unwrap_err(), ClaimError::ConnectSuperseded);
        assert!(!store.is_connected());
    }

    struct UnlockPopup {
        fail: bool,
        runs: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::registry::EnableHook for UnlockPopup {
        async fn before_enable(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClaimError::Provider("popup closed".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_enable_hook_runs_before_enable() {
        let hook = Arc::new(UnlockPopup {
            fail: false,
            runs: Default::default(),
        });
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        let connector = ScriptedConnector::with_wallet(wallet);
        let (store, _notices) = store_with(connector.clone());

        store
            .connect(&eternl().with_enable_hook(hook.clone()))
            .await
            .unwrap();

        assert_eq!(hook.runs.load(Ordering::SeqCst), 1);
        assert_eq!(connector.enabled_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_enable_hook_aborts_connect() {
        let hook = Arc::new(UnlockPopup {
            fail: true,
            runs: Default::default(),
        });
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        let connector = ScriptedConnector::with_wallet(wallet);
        let (store, _notices) = store_with(connector.clone());

        let err = store
            .connect(&eternl().with_enable_hook(hook))
            .await
            .unwrap_err();

        assert!(matches!(err, ClaimError::Provider(_)));
        assert!(connector.enabled_ids().is_empty());
        assert!(!store.is_connected());
        assert!(!store.is_connecting());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let wallet = Arc::new(ScriptedWallet::new(ADDRESS));
        let (store, _notices) = store_with(ScriptedConnector::with_wallet(wallet));
        let mut rx = store.subscribe();

        store.connect(&eternl()).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|s| s.account_address().to_string()),
            Some(ADDRESS.to_string())
        );

        store.disconnect();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
