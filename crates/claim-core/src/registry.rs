//! Catalog of supported wallets and install detection

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

/// Reports whether a wallet extension is present in the host environment
#[async_trait]
pub trait InstallDetector: Send + Sync {
    async fn is_installed(&self) -> Result<bool>;
}

/// Provider-specific step run before the wallet is enabled
#[async_trait]
pub trait EnableHook: Send + Sync {
    async fn before_enable(&self) -> Result<()>;
}

/// Catalog entry for a supported wallet
#[derive(Clone)]
pub struct WalletDescriptor {
    /// Provider id passed to `enable` (e.g. "eternl", "lace")
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    /// Icon reference for the host UI
    pub icon_ref: String,
    /// Where to get the extension when it is not installed
    pub download_url: String,
    install_detector: Option<Arc<dyn InstallDetector>>,
    enable_hook: Option<Arc<dyn EnableHook>>,
}

impl WalletDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            icon_ref: format!("{}.svg", id),
            id,
            display_name: display_name.into(),
            download_url: String::new(),
            install_detector: None,
            enable_hook: None,
        }
    }

    pub fn with_icon(mut self, icon_ref: impl Into<String>) -> Self {
        self.icon_ref = icon_ref.into();
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    pub fn with_install_detector(mut self, detector: Arc<dyn InstallDetector>) -> Self {
        self.install_detector = Some(detector);
        self
    }

    pub fn with_enable_hook(mut self, hook: Arc<dyn EnableHook>) -> Self {
        self.enable_hook = Some(hook);
        self
    }

    pub fn enable_hook(&self) -> Option<&Arc<dyn EnableHook>> {
        self.enable_hook.as_ref()
    }

    pub fn has_install_detector(&self) -> bool {
        self.install_detector.is_some()
    }
}

impl fmt::Debug for WalletDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("icon_ref", &self.icon_ref)
            .field("download_url", &self.download_url)
            .field("install_detector", &self.install_detector.is_some())
            .field("enable_hook", &self.enable_hook.is_some())
            .finish()
    }
}

impl PartialEq for WalletDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Result of probing every registered wallet
#[derive(Debug, Clone, Default)]
pub struct WalletPartition {
    pub installed: Vec<WalletDescriptor>,
    pub not_installed: Vec<WalletDescriptor>,
}

/// Ordered catalog of supported wallets
#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    descriptors: Vec<WalletDescriptor>,
}

impl WalletRegistry {
    pub fn new(descriptors: Vec<WalletDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Supported CIP-30 wallets, without install detectors
    pub fn cardano() -> Self {
        Self::new(vec![
            WalletDescriptor::new("eternl", "Eternl").with_download_url("https://eternl.io"),
            WalletDescriptor::new("lace", "Lace").with_download_url("https://www.lace.io"),
            WalletDescriptor::new("nami", "Nami").with_download_url("https://namiwallet.io"),
            WalletDescriptor::new("typhoncip30", "Typhon")
                .with_icon("typhon.svg")
                .with_download_url("https://typhonwallet.io"),
            WalletDescriptor::new("yoroi", "Yoroi").with_download_url("https://yoroi-wallet.com"),
            WalletDescriptor::new("vespr", "VESPR").with_download_url("https://vespr.xyz"),
            WalletDescriptor::new("gerowallet", "GeroWallet")
                .with_icon("gero.svg")
                .with_download_url("https://gerowallet.io"),
            WalletDescriptor::new("nufi", "NuFi").with_download_url("https://nu.fi"),
        ])
    }

    /// All descriptors in registry order
    pub fn list_descriptors(&self) -> &[WalletDescriptor] {
        &self.descriptors
    }

    /// Look up a descriptor by provider id
    pub fn get(&self, id: &str) -> Option<&WalletDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Replace the descriptor with the same id, keeping its position
    pub fn bind(&mut self, descriptor: WalletDescriptor) {
        match self.descriptors.iter_mut().find(|d| d.id == descriptor.id) {
            Some(slot) => *slot = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    /// Whether the wallet is installed; anything but a clean `true` counts as not installed
    pub async fn probe(&self, descriptor: &WalletDescriptor) -> bool {
        let Some(detector) = descriptor.install_detector.clone() else {
            return false;
        };

        match AssertUnwindSafe(detector.is_installed()).catch_unwind().await {
            Ok(Ok(installed)) => installed,
            Ok(Err(e)) => {
                warn!("Install probe for {} failed: {}", descriptor.id, e);
                false
            }
            Err(_) => {
                warn!("Install probe for {} panicked", descriptor.id);
                false
            }
        }
    }

    /// Probe every wallet and split by install state, keeping registry order
    pub async fn partition(&self) -> WalletPartition {
        let probes = self.descriptors.iter().map(|d| self.probe(d));
        let results = join_all(probes).await;

        let mut partition = WalletPartition::default();
        for (descriptor, installed) in self.descriptors.iter().zip(results) {
            if installed {
                partition.installed.push(descriptor.clone());
            } else {
                partition.not_installed.push(descriptor.clone());
            }
        }

        debug!(
            "Wallet probe: {} installed, {} not installed",
            partition.installed.len(),
            partition.not_installed.len()
        );
        partition
    }
}
