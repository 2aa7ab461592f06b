//! Player endpoint implementation for stream URL extraction.

use cadenza_core::{AudioFormat, Error, Result, StreamCollection, StreamInfo};
use tracing::debug;

use crate::{
    types::{Format, InnerTubeRequest, PlayerPayload, RawPlayerResponse, VideoDetails},
    InnerTubeClient,
};

/// Default stream lifetime when the response omits it (6 hours).
const DEFAULT_EXPIRES_IN_SECS: u64 = 21_600;

/// Playable audio streams for one video.
#[derive(Debug, Clone)]
pub struct PlayerStreams {
    pub details: Option<VideoDetails>,
    pub streams: StreamCollection,
}

impl InnerTubeClient {
    /// Get the directly playable audio streams for a video.
    ///
    /// Streams that need signature deciphering are skipped.
    pub async fn get_streams(&self, video_id: &str) -> Result<PlayerStreams> {
        let request = InnerTubeRequest::new(self.context.clone(), PlayerPayload::new(video_id));

        let response: RawPlayerResponse = self.post("player", &request).await?;

        if let Some(status) = &response.playability_status {
            if status.status != "OK" {
                let reason = status.reason.as_deref().unwrap_or("Unknown error");
                return Err(Error::ContentNotAvailable(format!(
                    "{}: {reason}",
                    status.status
                )));
            }
        }

        let streams = parse_streams(&response, unix_now())?;
        debug!("{video_id}: {} playable audio streams", streams.len());

        if streams.is_empty() {
            return Err(Error::ContentNotAvailable(
                "No directly playable audio streams".to_string(),
            ));
        }

        Ok(PlayerStreams {
            details: response.video_details,
            streams: StreamCollection::new(streams),
        })
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn parse_streams(response: &RawPlayerResponse, now: u64) -> Result<Vec<StreamInfo>> {
    let streaming_data = response
        .streaming_data
        .as_ref()
        .ok_or_else(|| Error::ContentNotAvailable("No streaming data".to_string()))?;

    let expires_in: u64 = streaming_data
        .expires_in_seconds
        .as_ref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    let expires_at = now + expires_in;

    let mut streams: Vec<StreamInfo> = streaming_data
        .adaptive_formats
        .iter()
        .flatten()
        .filter(|f| f.is_audio_only())
        .filter_map(|f| parse_format(f, expires_at))
        .collect();

    // Muxed formats only when no audio-only stream is playable
    if streams.is_empty() {
        streams.extend(
            streaming_data
                .formats
                .iter()
                .flatten()
                .filter_map(|f| parse_format(f, expires_at)),
        );
    }

    streams.sort_by_key(|s| std::cmp::Reverse(s.quality_score()));

    Ok(streams)
}

fn parse_format(format: &Format, expires_at: u64) -> Option<StreamInfo> {
    // Ciphered formats carry no direct url and are skipped.
    let url = format.url.clone()?;

    let mut stream = StreamInfo::new(url, AudioFormat::from_mime(&format.mime_type));
    stream.bitrate = format.kbps();
    stream.sample_rate = format.sample_rate_u32();
    stream.channels = format.audio_channels;
    stream.content_length = format.content_length_u64();
    stream.mime_type = Some(format.mime_type.clone());
    stream.expires_at = Some(expires_at);

    Some(stream)
}
