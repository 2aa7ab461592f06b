//! Resolver configuration and engine construction.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cadenza_core::{Error, Result};
use cadenza_extractor::Extractor;
use cadenza_innertube::{ClientContext, InnerTubeClient};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::engine::{ResolutionEngine, Strategy};
use crate::providers::{
    savetube, vreden, InnerTubeProvider, SaveTubeProvider, VredenProvider, YtDlpProvider,
};
use crate::registry::ProviderRegistry;
use crate::retry::RetryPolicy;

/// `[resolver]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub strategy: Strategy,
    /// Per-call timeout for direct HTTP adapters.
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
    pub providers: ProvidersConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            request_timeout_secs: 8,
            retry: RetryConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

/// `[resolver.retry]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 400,
        }
    }
}

/// `[resolver.providers.*]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub ytdlp: YtDlpConfig,
    pub innertube: InnerTubeConfig,
    pub vreden: HttpProviderConfig,
    pub savetube: HttpProviderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YtDlpConfig {
    pub enabled: bool,
    /// Explicit binary; discovered when unset.
    pub path: Option<PathBuf>,
    /// Browser to read cookies from (`firefox`, `chrome`, ...).
    pub cookies_from_browser: Option<String>,
    pub timeout_secs: u64,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            cookies_from_browser: None,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerTubeConfig {
    pub enabled: bool,
    /// `android_music`, `web_remix` or `ios_music`.
    pub client: String,
    pub base_url: Option<String>,
}

impl Default for InnerTubeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            client: "android_music".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpProviderConfig {
    pub enabled: bool,
    /// Overrides the adapter's default endpoint root.
    pub base_url: Option<String>,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "resolver.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "resolver.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.providers.ytdlp.timeout_secs == 0 {
            return Err(Error::Config(
                "resolver.providers.ytdlp.timeout_secs must be positive".to_string(),
            ));
        }
        if ClientContext::from_name(&self.providers.innertube.client).is_none() {
            return Err(Error::Config(format!(
                "unknown InnerTube client {:?}",
                self.providers.innertube.client
            )));
        }

        for (name, base_url) in [
            ("innertube", &self.providers.innertube.base_url),
            ("vreden", &self.providers.vreden.base_url),
            ("savetube", &self.providers.savetube.base_url),
        ] {
            if let Some(base_url) = base_url {
                check_base_url(name, base_url)?;
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Construct every enabled adapter, check it, and keep the available ones
    /// in default order.
    pub async fn build_registry(&self) -> Result<ProviderRegistry> {
        self.validate()?;
        let providers = &self.providers;
        let timeout = self.request_timeout();
        let mut registry = ProviderRegistry::new();

        if providers.ytdlp.enabled {
            let mut extractor = providers
                .ytdlp
                .path
                .clone()
                .map_or_else(Extractor::new, Extractor::with_path)
                .with_timeout(Duration::from_secs(providers.ytdlp.timeout_secs));
            if let Some(browser) = &providers.ytdlp.cookies_from_browser {
                extractor = extractor.with_browser_cookies(browser);
            }
            registry
                .register(Arc::new(YtDlpProvider::new(extractor)))
                .await;
        } else {
            registry.register_disabled(YtDlpProvider::NAME);
        }

        if providers.innertube.enabled {
            let context = ClientContext::from_name(&providers.innertube.client)
                .unwrap_or_else(ClientContext::music_android);
            let mut client = InnerTubeClient::with_timeout(context, timeout)?;
            if let Some(base_url) = &providers.innertube.base_url {
                client = client.with_base_url(base_url);
            }
            registry
                .register(Arc::new(InnerTubeProvider::new(client)))
                .await;
        } else {
            registry.register_disabled(InnerTubeProvider::NAME);
        }

        if providers.vreden.enabled {
            let provider = VredenProvider::new(timeout)?.with_base_url(
                providers
                    .vreden
                    .base_url
                    .as_deref()
                    .unwrap_or(vreden::DEFAULT_BASE_URL),
            );
            registry.register(Arc::new(provider)).await;
        } else {
            registry.register_disabled(VredenProvider::NAME);
        }

        if providers.savetube.enabled {
            let provider = SaveTubeProvider::new(timeout)?.with_base_url(
                providers
                    .savetube
                    .base_url
                    .as_deref()
                    .unwrap_or(savetube::DEFAULT_BASE_URL),
            );
            registry.register(Arc::new(provider)).await;
        } else {
            registry.register_disabled(SaveTubeProvider::NAME);
        }

        info!(
            "Provider registry ready: {:?} ({} configured)",
            registry.names(),
            registry.statuses().len()
        );
        Ok(registry)
    }

    pub async fn build_engine(&self) -> Result<ResolutionEngine> {
        let registry = self.build_registry().await?;
        Ok(ResolutionEngine::new(registry)
            .with_retry_policy(self.retry_policy())
            .with_strategy(self.strategy))
    }
}

fn check_base_url(provider: &str, base_url: &str) -> Result<()> {
    match Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(Error::Config(format!(
            "{provider} base_url has unsupported scheme {}",
            url.scheme()
        ))),
        Err(e) => Err(Error::Config(format!(
            "{provider} base_url {base_url:?} is invalid: {e}"
        ))),
    }
}
