//! `InnerTube` API client implementation.

use std::time::Duration;

use cadenza_core::{Error, HttpError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::context::ClientContext;

const BASE_URL: &str = "https://music.youtube.com/youtubei/v1";
const ORIGIN: &str = "https://music.youtube.com";
const REFERER: &str = "https://music.youtube.com/";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// `YouTube` `InnerTube` API client.
#[derive(Clone)]
pub struct InnerTubeClient {
    /// HTTP client for making requests.
    http: reqwest::Client,
    /// Client context for requests.
    pub(crate) context: ClientContext,
    /// Endpoint root, overridable for tests and mirrors.
    base_url: String,
}

impl InnerTubeClient {
    /// Create a new `InnerTube` client using the Android Music context.
    pub fn new() -> Result<Self> {
        Self::with_context(ClientContext::music_android())
    }

    /// Create a new `InnerTube` client with a specific context.
    pub fn with_context(context: ClientContext) -> Result<Self> {
        Self::with_timeout(context, DEFAULT_TIMEOUT)
    }

    /// Create a new `InnerTube` client with a specific context and per-request timeout.
    pub fn with_timeout(context: ClientContext, timeout: Duration) -> Result<Self> {
        let header = |value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| Error::Network(format!("Invalid header value {value:?}: {e}")))
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Goog-Api-Key",
            HeaderValue::from_static(context.client.api_key()),
        );
        headers.insert(
            "X-YouTube-Client-Name",
            header(&context.client.client_id().to_string())?,
        );
        headers.insert(
            "X-YouTube-Client-Version",
            header(&context.client.client_version)?,
        );
        headers.insert("Origin", HeaderValue::from_static(ORIGIN));
        headers.insert("Referer", HeaderValue::from_static(REFERER));

        if let Some(ua) = &context.client.user_agent {
            headers.insert(USER_AGENT, header(ua)?);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            context,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Make a POST request to an `InnerTube` endpoint.
    pub(crate) async fn post<T, R>(&self, endpoint: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        let body_bytes = serde_json::to_vec(body)?;

        debug!("POST {url} ({} bytes)", body_bytes.len());
        let response_bytes = self.do_request(&url, body_bytes).await?;

        serde_json::from_slice(&response_bytes)
            .map_err(|e| Error::ParseError(format!("Failed to parse response: {e}")))
    }

    async fn do_request(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(url)
            .body(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Http(HttpError::StatusError {
                status: status.as_u16(),
                message,
            }));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::Network(format!("Failed to read response body: {e}")))
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Http(HttpError::Timeout)
    } else if e.is_connect() {
        Error::Http(HttpError::ConnectionFailed(e.to_string()))
    } else {
        Error::Network(e.to_string())
    }
}
