//! Capability-checked provider registry.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::provider::{AudioProvider, Availability};

/// Availability report for one configured provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub enabled: bool,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ordered list of providers that passed their capability check.
///
/// Built once; unavailable providers are left out and never invoked.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AudioProvider>>,
    statuses: Vec<ProviderStatus>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register providers without probing them.
    pub fn from_providers(providers: Vec<Arc<dyn AudioProvider>>) -> Self {
        let statuses = providers
            .iter()
            .map(|p| ProviderStatus {
                name: p.name().to_string(),
                enabled: true,
                available: true,
                reason: None,
            })
            .collect();
        Self {
            providers,
            statuses,
        }
    }

    /// Check `provider` and append it if available.
    pub async fn register(&mut self, provider: Arc<dyn AudioProvider>) {
        let name = provider.name().to_string();
        match provider.available().await {
            Availability::Available => {
                info!("Provider {name} available");
                self.statuses.push(ProviderStatus {
                    name,
                    enabled: true,
                    available: true,
                    reason: None,
                });
                self.providers.push(provider);
            }
            Availability::Unavailable(reason) => {
                warn!("Provider {name} unavailable, excluding it: {reason}");
                self.statuses.push(ProviderStatus {
                    name,
                    enabled: true,
                    available: false,
                    reason: Some(reason),
                });
            }
        }
    }

    /// Record a provider that was turned off in configuration.
    pub fn register_disabled(&mut self, name: &str) {
        info!("Provider {name} disabled by configuration");
        self.statuses.push(ProviderStatus {
            name: name.to_string(),
            enabled: false,
            available: false,
            reason: Some("disabled".to_string()),
        });
    }

    pub fn providers(&self) -> &[Arc<dyn AudioProvider>] {
        &self.providers
    }

    pub fn statuses(&self) -> &[ProviderStatus] {
        &self.statuses
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("statuses", &self.statuses)
            .finish()
    }
}
