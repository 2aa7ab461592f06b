//! Stream and audio format types.

use serde::{Deserialize, Serialize};

/// Information about an audio stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamInfo {
    /// The stream URL.
    pub url: String,
    /// Audio format/codec.
    pub format: AudioFormat,
    /// Bitrate in kbps (if known).
    pub bitrate: Option<u32>,
    /// Sample rate in Hz (if known).
    pub sample_rate: Option<u32>,
    /// Number of audio channels (if known).
    pub channels: Option<u8>,
    /// Content length in bytes (if known).
    pub content_length: Option<u64>,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Expiry time (Unix timestamp).
    pub expires_at: Option<u64>,
}

impl StreamInfo {
    pub fn new(url: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            url: url.into(),
            format,
            bitrate: None,
            sample_rate: None,
            channels: None,
            content_length: None,
            mime_type: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub const fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate = Some(kbps);
        self
    }

    /// Get a quality score for sorting (higher is better).
    ///
    /// Bitrate dominates; codec efficiency breaks ties.
    pub fn quality_score(&self) -> u32 {
        self.bitrate.unwrap_or(0) * 1000 + self.format.quality_score()
    }
}

/// Audio codec/format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Opus codec (best quality/size ratio).
    Opus,
    /// AAC codec.
    Aac,
    /// MP3 codec.
    Mp3,
    /// FLAC codec (lossless).
    Flac,
    /// Vorbis codec.
    Vorbis,
    /// `WebM` container with audio.
    WebM,
    /// MP4/M4A container.
    M4a,
    /// Unknown format.
    #[default]
    Unknown,
}

impl AudioFormat {
    /// Parse from MIME type or format string.
    pub fn from_mime(mime: &str) -> Self {
        let mime_lower = mime.to_lowercase();

        if mime_lower.contains("opus") {
            Self::Opus
        } else if mime_lower.contains("aac") || mime_lower.contains("mp4a") {
            Self::Aac
        } else if mime_lower.contains("mp3") || mime_lower.contains("mpeg") {
            Self::Mp3
        } else if mime_lower.contains("flac") {
            Self::Flac
        } else if mime_lower.contains("vorbis") {
            Self::Vorbis
        } else if mime_lower.contains("webm") {
            Self::WebM
        } else if mime_lower.contains("m4a") {
            Self::M4a
        } else {
            Self::Unknown
        }
    }

    /// Get the file extension for this format.
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Opus | Self::WebM => "webm",
            Self::Aac | Self::M4a => "m4a",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Vorbis => "ogg",
            Self::Unknown => "audio",
        }
    }

    /// Quality score for sorting (higher = better codec efficiency).
    pub const fn quality_score(&self) -> u32 {
        match self {
            Self::Opus => 100,
            Self::Flac => 95,
            Self::Aac | Self::M4a => 80,
            Self::Vorbis => 75,
            Self::Mp3 => 70,
            Self::WebM => 60,
            Self::Unknown => 0,
        }
    }
}

/// Represents a collection of available streams for a track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamCollection {
    pub streams: Vec<StreamInfo>,
}

impl StreamCollection {
    pub const fn new(streams: Vec<StreamInfo>) -> Self {
        Self { streams }
    }

    /// Get the best stream whose known bitrate does not exceed `max_kbps`.
    pub fn best_within(&self, max_kbps: u32) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .filter(|s| s.bitrate.is_some_and(|b| b <= max_kbps))
            .max_by_key(|s| s.quality_score())
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
