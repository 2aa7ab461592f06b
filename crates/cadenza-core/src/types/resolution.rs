//! Resolution request, per-attempt diagnostics and results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::{Error, FailureKind, ProviderError, QualityTier, Result};

/// A request to resolve a locator into a direct audio URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_quality: Option<QualityTier>,
}

impl ResolutionRequest {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            preferred_quality: None,
        }
    }

    #[must_use]
    pub const fn with_preferred_quality(mut self, quality: QualityTier) -> Self {
        self.preferred_quality = Some(quality);
        self
    }
}

/// Success payload every provider normalizes to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedAudio {
    /// Direct audio URL.
    pub url: String,
    /// Suggested filename for the download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Provider-specific metadata (title, duration, thumbnail, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ResolvedAudio {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the payload shape: the URL must be a non-empty absolute http(s) URL.
    pub fn validate(self) -> std::result::Result<Self, ProviderError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ProviderError::invalid("payload has no download URL"));
        }
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(self),
            Ok(parsed) => Err(ProviderError::invalid(format!(
                "download URL has unsupported scheme {}",
                parsed.scheme()
            ))),
            Err(e) => Err(ProviderError::invalid(format!("download URL is malformed: {e}"))),
        }
    }
}

/// `<title>.<ext>` with characters that are unsafe in filenames replaced.
pub fn download_filename(title: &str, ext: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.{ext}", cleaned.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// Structured failure detail attached to a [`ProviderAttempt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptError {
    pub kind: FailureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response body or error message.
    pub data: String,
}

impl From<&ProviderError> for AttemptError {
    fn from(err: &ProviderError) -> Self {
        Self {
            kind: err.kind(),
            status: err.status(),
            data: err.detail().to_string(),
        }
    }
}

/// One (quality, provider) slot as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub quality: QualityTier,
    pub outcome: AttemptOutcome,
    /// Calls made by the retry wrapper for this slot.
    pub tries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AttemptError>,
}

impl ProviderAttempt {
    pub fn succeeded(provider: impl Into<String>, quality: QualityTier, tries: u32) -> Self {
        Self {
            provider: provider.into(),
            quality,
            outcome: AttemptOutcome::Success,
            tries,
            error: None,
        }
    }

    pub fn failed(
        provider: impl Into<String>,
        quality: QualityTier,
        tries: u32,
        err: &ProviderError,
    ) -> Self {
        Self {
            provider: provider.into(),
            quality,
            outcome: AttemptOutcome::Failure,
            tries,
            error: Some(err.into()),
        }
    }
}

/// A successful resolution: the payload plus the slot that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub audio: ResolvedAudio,
    pub attempt: ProviderAttempt,
}

impl Resolution {
    pub fn new(
        audio: ResolvedAudio,
        provider: impl Into<String>,
        quality: QualityTier,
        tries: u32,
    ) -> Self {
        Self {
            audio,
            attempt: ProviderAttempt::succeeded(provider, quality, tries),
        }
    }

    pub const fn quality(&self) -> QualityTier {
        self.attempt.quality
    }

    pub fn provider(&self) -> &str {
        &self.attempt.provider
    }
}

/// Flattened outcome of a resolution, success or exhaustion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_used: Option<QualityTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_used: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_details: Vec<ProviderAttempt>,
}

impl ResolutionResult {
    pub fn exhausted(failure_details: Vec<ProviderAttempt>) -> Self {
        Self {
            success: false,
            url: None,
            filename: None,
            metadata: None,
            quality_used: None,
            provider_used: None,
            failure_details,
        }
    }

    /// Flatten an engine outcome. Input errors are passed through.
    pub fn from_outcome(outcome: Result<Resolution>) -> Result<Self> {
        match outcome {
            Ok(resolution) => Ok(resolution.into()),
            Err(Error::Exhausted(attempts)) => Ok(Self::exhausted(attempts)),
            Err(other) => Err(other),
        }
    }
}

impl From<Resolution> for ResolutionResult {
    fn from(resolution: Resolution) -> Self {
        Self {
            success: true,
            url: Some(resolution.audio.url),
            filename: resolution.audio.filename,
            metadata: Some(resolution.audio.metadata),
            quality_used: Some(resolution.attempt.quality),
            provider_used: Some(resolution.attempt.provider),
            failure_details: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_missing_url() {
        let err = ResolvedAudio::new("  ").validate().unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidResponse);
        assert!(ResolvedAudio::new("ftp://cdn/a.mp3").validate().is_err());
        assert!(ResolvedAudio::new("https://cdn.example/a.mp3").validate().is_ok());
    }

    #[test]
    fn test_download_filename_sanitized() {
        assert_eq!(
            download_filename(" Artist - Song: Live/Remix ", "m4a"),
            "Artist - Song_ Live_Remix.m4a"
        );
        assert_eq!(download_filename("a\tb", "webm"), "a_b.webm");
    }

    #[test]
    fn test_failed_attempt_serialization() {
        let err = ProviderError::Transient {
            status: Some(502),
            message: "bad gateway".into(),
        };
        let attempt = ProviderAttempt::failed("vreden", QualityTier::Kbps320, 2, &err);
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["provider"], "vreden");
        assert_eq!(json["quality"], 320);
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["error"]["kind"], "transient");
        assert_eq!(json["error"]["status"], 502);
        assert_eq!(json["error"]["data"], "bad gateway");
    }

    #[test]
    fn test_result_from_outcome() {
        let resolution = Resolution::new(
            ResolvedAudio::new("https://cdn.example/a.mp3").with_filename("a.mp3"),
            "B",
            QualityTier::Kbps256,
            1,
        );
        assert_eq!(resolution.attempt.outcome, AttemptOutcome::Success);
        assert!(resolution.attempt.error.is_none());

        let ok = ResolutionResult::from_outcome(Ok(resolution)).unwrap();
        assert!(ok.success);
        assert_eq!(ok.quality_used, Some(QualityTier::Kbps256));
        assert_eq!(ok.provider_used.as_deref(), Some("B"));
        assert!(ok.failure_details.is_empty());

        let attempt = ProviderAttempt::failed(
            "A",
            QualityTier::Kbps92,
            2,
            &ProviderError::transient("timeout"),
        );
        let failed =
            ResolutionResult::from_outcome(Err(Error::Exhausted(vec![attempt.clone()]))).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.failure_details, vec![attempt]);

        let input = ResolutionResult::from_outcome(Err(Error::InvalidInput("empty".into())));
        assert!(input.unwrap_err().is_input_error());
    }
}
