//! InnerTube-specific request and response structures.

use serde::{Deserialize, Serialize};

/// Request body for `InnerTube` endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct InnerTubeRequest<T> {
    pub context: crate::ClientContext,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> InnerTubeRequest<T> {
    pub const fn new(context: crate::ClientContext, payload: T) -> Self {
        Self { context, payload }
    }
}

/// Player request payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPayload {
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_check_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub racy_check_ok: Option<bool>,
}

impl PlayerPayload {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            content_check_ok: Some(true),
            racy_check_ok: Some(true),
        }
    }
}

/// Raw `InnerTube` response for player.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub streaming_data: Option<StreamingData>,
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    pub formats: Option<Vec<Format>>,
    pub adaptive_formats: Option<Vec<Format>>,
    pub expires_in_seconds: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    /// Absent for ciphered formats.
    pub url: Option<String>,
    pub mime_type: String,
    pub bitrate: Option<u32>,
    pub average_bitrate: Option<u32>,
    pub content_length: Option<String>,
    pub audio_sample_rate: Option<String>,
    pub audio_channels: Option<u8>,
}

impl Format {
    /// Check if this is an audio-only format.
    pub fn is_audio_only(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    /// Bitrate in kbps, preferring the average over the peak.
    pub fn kbps(&self) -> Option<u32> {
        self.average_bitrate.or(self.bitrate).map(|b| b / 1000)
    }

    /// Get the content length as u64.
    pub fn content_length_u64(&self) -> Option<u64> {
        self.content_length.as_ref()?.parse().ok()
    }

    /// Get the sample rate as u32.
    pub fn sample_rate_u32(&self) -> Option<u32> {
        self.audio_sample_rate.as_ref()?.parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub length_seconds: Option<String>,
    pub author: Option<String>,
    pub thumbnail: Option<ThumbnailContainer>,
}

impl VideoDetails {
    /// URL of the largest thumbnail.
    pub fn best_thumbnail(&self) -> Option<&str> {
        self.thumbnail
            .as_ref()?
            .thumbnails
            .iter()
            .max_by_key(|t| t.width.unwrap_or(0))
            .map(|t| t.url.as_str())
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.length_seconds.as_ref()?.parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailContainer {
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailItem {
    pub url: String,
    pub width: Option<u32>,
}
