//! `api.vreden.my.id` scraper adapter.

use std::time::Duration;

use async_trait::async_trait;
use cadenza_core::{Locator, ProviderError, QualityTier, ResolvedAudio, Result};
use tracing::debug;

use super::http;
use crate::provider::AudioProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.vreden.my.id";

/// `GET {base}/api/v1/download/youtube/audio?url=..&quality=..`
pub struct VredenProvider {
    http: reqwest::Client,
    base_url: String,
}

impl VredenProvider {
    pub const NAME: &'static str = "vreden";

    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http::client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AudioProvider for VredenProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn resolve(
        &self,
        locator: &Locator,
        quality: QualityTier,
    ) -> std::result::Result<ResolvedAudio, ProviderError> {
        let endpoint = format!("{}/api/v1/download/youtube/audio", self.base_url);
        let quality = quality.kbps().to_string();
        debug!("GET {endpoint} quality={quality}");

        let request = self
            .http
            .get(endpoint)
            .query(&[("url", locator.as_str()), ("quality", quality.as_str())]);
        http::send(request).await
    }
}
