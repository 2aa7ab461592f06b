//! Native `InnerTube` player adapter.

use async_trait::async_trait;
use cadenza_core::{download_filename, Locator, ProviderError, QualityTier, ResolvedAudio};
use cadenza_innertube::InnerTubeClient;
use serde_json::Value;
use tracing::debug;

use crate::provider::AudioProvider;

/// Picks the best directly playable audio stream at or below the tier.
pub struct InnerTubeProvider {
    client: InnerTubeClient,
}

impl InnerTubeProvider {
    pub const NAME: &'static str = "innertube";

    pub const fn new(client: InnerTubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AudioProvider for InnerTubeProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn resolve(
        &self,
        locator: &Locator,
        quality: QualityTier,
    ) -> Result<ResolvedAudio, ProviderError> {
        let Some(video_id) = locator.video_id() else {
            return Err(ProviderError::Unavailable(format!(
                "{locator} is not a YouTube video"
            )));
        };

        let player = self.client.get_streams(video_id).await?;
        let stream = player
            .streams
            .best_within(quality.kbps())
            .ok_or_else(|| {
                ProviderError::invalid(format!(
                    "no audio stream at or below {quality} ({} streams)",
                    player.streams.len()
                ))
            })?;

        debug!(
            "{video_id}: picked {:?} at {:?}kbps for {quality}",
            stream.format, stream.bitrate
        );

        let ext = stream.format.extension();
        let mut audio = ResolvedAudio::new(stream.url.clone())
            .with_metadata("videoId", video_id)
            .with_metadata("ext", ext);
        if let Some(kbps) = stream.bitrate {
            audio = audio.with_metadata("abr", kbps);
        }
        if let Some(mime) = &stream.mime_type {
            audio = audio.with_metadata("mimeType", mime.as_str());
        }
        if let Some(expires_at) = stream.expires_at {
            audio = audio.with_metadata("expiresAt", expires_at);
        }

        if let Some(details) = &player.details {
            audio = audio
                .with_filename(download_filename(&details.title, ext))
                .with_metadata("title", details.title.as_str());
            if let Some(author) = &details.author {
                audio = audio.with_metadata("uploader", author.as_str());
            }
            if let Some(secs) = details.duration_secs() {
                audio = audio.with_metadata("duration", secs);
            }
            if let Some(thumb) = details.best_thumbnail() {
                audio = audio.with_metadata("thumbnail", Value::from(thumb));
            }
        }

        Ok(audio)
    }
}
