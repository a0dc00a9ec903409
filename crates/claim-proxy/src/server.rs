//! Proxy server orchestration

use tokio::net::TcpListener;
use tracing::info;

use claim_core::Settings;

use crate::error::ProxyError;
use crate::routes::router;
use crate::settlement::SettlementClient;

/// Backend proxy in front of the settlement service
pub struct ProxyServer {
    settings: Settings,
}

impl ProxyServer {
    /// Create a new proxy server
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Bind `0.0.0.0:{listen_port}` and serve until shutdown
    pub async fn run(&self) -> Result<(), ProxyError> {
        let addr = format!("0.0.0.0:{}", self.settings.listen_port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ProxyError> {
        self.settings.validate()?;

        let settlement = SettlementClient::new(
            &self.settings.settlement_url,
            self.settings.request_timeout(),
        )?;
        let app = router(settlement);

        info!(
            "Claim proxy listening on {} (settlement: {})",
            listener.local_addr()?,
            self.settings.settlement_url
        );

        axum::serve(listener, app).await?;
        Ok(())
    }
}
