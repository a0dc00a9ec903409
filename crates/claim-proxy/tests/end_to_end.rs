//! Connect, query and consolidate through a real proxy and a fake settlement service

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use claim_core::testkit::{ScriptedConnector, ScriptedWallet};
use claim_core::{
    AllocationStatus, ClaimClient, ClaimError, ConsolidationResult, NoticeLevel,
    RecordingNotices, Settings, WalletRegistry,
};
use claim_proxy::ProxyServer;

const SOURCE: &str = "addr1qsource";

type Paths = Arc<Mutex<Vec<String>>>;

async fn settlement_service() -> (SocketAddr, Paths) {
    let paths: Paths = Arc::new(Mutex::new(Vec::new()));
    let recorded = paths.clone();

    let app = Router::new()
        .route(
            "/statistics/:address",
            get(|Path(address): Path<String>| async move {
                if address == SOURCE {
                    (
                        StatusCode::OK,
                        r#"{"local":{"night_allocation":"344776100"},"estimatedShare":0.00005464}"#,
                    )
                } else {
                    (StatusCode::NOT_FOUND, "not registered")
                }
            }),
        )
        .route(
            "/donate_to/:donate/:user/:signature",
            post(
                move |Path((donate, user, signature)): Path<(String, String, String)>| {
                    let recorded = recorded.clone();
                    async move {
                        recorded
                            .lock()
                            .unwrap()
                            .push(format!("{}/{}/{}", donate, user, signature));
                        if donate == "addr1qDUP" {
                            (
                                StatusCode::CONFLICT,
                                r#"{"statusCode":409,"message":"Destination already assigned"}"#,
                            )
                        } else {
                            (StatusCode::OK, r#"{"status":"queued"}"#)
                        }
                    }
                },
            ),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, paths)
}

async fn proxy(settlement: SocketAddr) -> SocketAddr {
    let settings = Settings {
        settlement_url: format!("http://{}", settlement),
        ..Settings::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        ProxyServer::new(settings).serve(listener).await.unwrap();
    });
    addr
}

fn client(proxy: SocketAddr, wallet: Arc<ScriptedWallet>, notices: Arc<RecordingNotices>) -> ClaimClient {
    let settings = Settings {
        proxy_url: format!("http://{}", proxy),
        ..Settings::default()
    };
    ClaimClient::from_settings(
        settings,
        WalletRegistry::cardano(),
        Arc::new(ScriptedConnector::with_wallet(wallet)),
        notices,
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_consolidation_flow() {
    let (settlement, paths) = settlement_service().await;
    let proxy = proxy(settlement).await;
    let wallet = Arc::new(ScriptedWallet::new(SOURCE));
    let notices = Arc::new(RecordingNotices::new());
    let client = client(proxy, wallet.clone(), notices.clone());

    let address = client.connect("eternl").await.unwrap();
    assert_eq!(address, SOURCE);

    let snapshot = client.allocation().snapshot();
    assert_eq!(snapshot.allocation_amount, 344_776_100);
    assert_eq!(snapshot.display_amount(), "344.7761 NIGHT");

    let result = client.submit("addr1qTEST").await.unwrap();
    assert!(matches!(result, ConsolidationResult::Accepted { .. }));
    assert_eq!(
        *paths.lock().unwrap(),
        vec![format!(
            "addr1qTEST/{}/{}",
            SOURCE,
            wallet.signature_for("addr1qTEST")
        )]
    );
    assert_eq!(
        notices.last().unwrap().message,
        "Consolidation request submitted. Check transactions/receipts for details."
    );
}

#[tokio::test]
async fn test_settlement_conflict_is_rejected() {
    let (settlement, _) = settlement_service().await;
    let proxy = proxy(settlement).await;
    let notices = Arc::new(RecordingNotices::new());
    let client = client(proxy, Arc::new(ScriptedWallet::new(SOURCE)), notices.clone());
    client.connect("lace").await.unwrap();
    notices.clear();

    let result = client.submit("addr1qDUP").await.unwrap();

    assert_eq!(
        result,
        ConsolidationResult::Rejected {
            status_code: 409,
            message: "Destination already assigned".to_string()
        }
    );
    assert!(notices.with_level(NoticeLevel::Success).is_empty());
}

#[tokio::test]
async fn test_unregistered_wallet_shows_no_data() {
    let (settlement, _) = settlement_service().await;
    let proxy = proxy(settlement).await;
    let notices = Arc::new(RecordingNotices::new());
    let client = client(proxy, Arc::new(ScriptedWallet::new("addr1qUNREG")), notices.clone());

    client.connect("nami").await.unwrap();

    assert_eq!(client.allocation(), AllocationStatus::NoData);
    assert_eq!(client.allocation().snapshot().estimated_share, 0.0);
    assert!(notices
        .with_level(NoticeLevel::Error)
        .iter()
        .any(|n| n.message == "Wallet address addr1qUNREG is not registered"));
}

#[tokio::test]
async fn test_proxy_unreachable_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = listener.local_addr().unwrap();
    drop(listener);

    let notices = Arc::new(RecordingNotices::new());
    let client = client(closed, Arc::new(ScriptedWallet::new(SOURCE)), notices);
    client.connect("eternl").await.unwrap();

    assert_eq!(client.allocation(), AllocationStatus::NoData);

    let result = client.submit("addr1qTEST").await.unwrap();
    assert!(matches!(
        result.error(),
        Some(ClaimError::TransportFailure { .. })
    ));
}
