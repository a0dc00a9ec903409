//! Claim proxy CLI
//!
//! Serves `/api/statistics` and `/api/donate` for the claim page, forwarding
//! both to the settlement service.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use claim_core::SettingsManager;
use claim_proxy::ProxyServer;

/// Backend proxy for NIGHT allocation queries and consolidation requests
#[derive(Parser, Debug)]
#[command(name = "claim-proxy")]
#[command(version)]
#[command(about = "Forward allocation queries and consolidation requests to the settlement service")]
struct Args {
    /// Path to the JSON settings file (defaults are used if it does not exist)
    #[arg(long, env = "CLAIM_PROXY_CONFIG", default_value = "claim-proxy.json")]
    config: PathBuf,

    /// Port to listen on (overrides the settings file)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Settlement service base URL (overrides the settings file)
    #[arg(long, env = "SETTLEMENT_URL")]
    settlement_url: Option<String>,

    /// Outbound request timeout in seconds (overrides the settings file)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let manager = SettingsManager::open(&args.config)
        .map_err(|e| format!("Failed to load settings from {:?}: {}", args.config, e))?;
    let mut settings = manager.get().clone();

    if let Some(port) = args.port {
        settings.listen_port = port;
    }
    if let Some(url) = args.settlement_url {
        settings.settlement_url = url;
    }
    if let Some(timeout) = args.timeout_secs {
        settings.request_timeout_secs = timeout;
    }

    info!("Starting claim proxy on http://localhost:{}", settings.listen_port);

    ProxyServer::new(settings).run().await?;

    Ok(())
}
