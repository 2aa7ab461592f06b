//! `cdn403.savetube.vip` scraper adapter.

use std::time::Duration;

use async_trait::async_trait;
use cadenza_core::{Locator, ProviderError, QualityTier, ResolvedAudio, Result};
use serde::Serialize;
use tracing::debug;

use super::http;
use crate::provider::AudioProvider;

pub const DEFAULT_BASE_URL: &str = "https://cdn403.savetube.vip";

#[derive(Serialize)]
struct InfoRequest<'a> {
    url: &'a str,
}

/// `POST {base}/v2/info` with `{url}`. The service picks the bitrate itself.
pub struct SaveTubeProvider {
    http: reqwest::Client,
    base_url: String,
}

impl SaveTubeProvider {
    pub const NAME: &'static str = "savetube";

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
impl AudioProvider for SaveTubeProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn resolve(
        &self,
        locator: &Locator,
        _quality: QualityTier,
    ) -> std::result::Result<ResolvedAudio, ProviderError> {
        let endpoint = format!("{}/v2/info", self.base_url);
        debug!("POST {endpoint}");

        let request = self.http.post(endpoint).json(&InfoRequest {
            url: locator.as_str(),
        });
        http::send(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::providers::serve_stub;
    use axum::{routing::post, Json, Router};
    use cadenza_core::FailureKind;
    use serde_json::{json, Value};

    async fn info(Json(body): Json<Value>) -> Json<Value> {
        match body["url"].as_str() {
            Some(url) if url.contains("dQw4w9WgXcQ") => Json(json!({
                "status": true,
                "download": {"url": "https://cdn.savetube/a.m4a", "filename": "Song.m4a"},
                "metadata": {"duration": 213}
            })),
            _ => Json(json!({"status": true, "download": null})),
        }
    }

    async fn provider() -> SaveTubeProvider {
        let base = serve_stub(Router::new().route("/v2/info", post(info))).await;
        SaveTubeProvider::new(Duration::from_secs(2))
            .unwrap()
            .with_base_url(format!("{base}/"))
    }

    #[tokio::test]
    async fn test_posts_locator_as_json() {
        let provider = provider().await;
        let locator = Locator::parse("https://youtu.be/dQw4w9WgXcQ").unwrap();

        let audio = provider.resolve(&locator, QualityTier::Kbps256).await.unwrap();
        assert_eq!(audio.url, "https://cdn.savetube/a.m4a");
        assert_eq!(audio.filename.as_deref(), Some("Song.m4a"));
        assert_eq!(audio.metadata["duration"], 213);
    }

    #[tokio::test]
    async fn test_missing_download_is_invalid() {
        let provider = provider().await;
        let locator = Locator::parse("https://youtu.be/aaaaaaaaaaa").unwrap();

        let err = provider
            .resolve(&locator, QualityTier::Kbps320)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidResponse);
        assert_eq!(err.status(), Some(200));
    }
}
