//! Shared plumbing for the direct HTTP scraper adapters.

use std::time::Duration;

use cadenza_core::{Error, ProviderError, ResolvedAudio, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Upper bound on response body text carried into diagnostics.
const MAX_BODY_CHARS: usize = 1024;

const CLIENT_USER_AGENT: &str = concat!("cadenza/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used by one adapter. `timeout` bounds each call.
pub fn client(timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))
}

/// `{status, download: {url, filename}, metadata}`, as returned by the scrapers.
#[derive(Debug, Deserialize)]
struct ScraperResponse {
    #[serde(default)]
    status: bool,
    download: Option<ScraperDownload>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ScraperDownload {
    url: Option<String>,
    filename: Option<String>,
}

/// Send a prepared request and normalize the scraper reply.
pub async fn send(
    request: reqwest::RequestBuilder,
) -> std::result::Result<ResolvedAudio, ProviderError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(ProviderError::Transient {
            status: Some(status.as_u16()),
            message: truncate(&body),
        });
    }

    parse_scraper(status.as_u16(), &body)
}

fn parse_scraper(status: u16, body: &str) -> std::result::Result<ResolvedAudio, ProviderError> {
    let invalid = |reason: &str| ProviderError::InvalidResponse {
        status: Some(status),
        message: format!("{reason}: {}", truncate(body)),
    };

    let parsed: ScraperResponse =
        serde_json::from_str(body).map_err(|e| invalid(&format!("unparsable body ({e})")))?;

    if !parsed.status {
        return Err(invalid("status is not true"));
    }

    let download = parsed.download.ok_or_else(|| invalid("no download object"))?;
    let url = download
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| invalid("no download url"))?;

    Ok(ResolvedAudio {
        url,
        filename: download.filename,
        metadata: parsed.metadata.unwrap_or_default(),
    })
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request failed: {e}")
    };
    ProviderError::Transient {
        status: e.status().map(|s| s.as_u16()),
        message,
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
