//! yt-dlp adapter: an optional local binary, checked once at registry build.

use async_trait::async_trait;
use cadenza_core::{Locator, ProviderError, QualityTier, ResolvedAudio};
use cadenza_extractor::{ExtractedStream, Extractor};
use serde_json::{Map, Value};

use crate::provider::{AudioProvider, Availability};

pub struct YtDlpProvider {
    extractor: Extractor,
}

impl YtDlpProvider {
    pub const NAME: &'static str = "yt-dlp";

    pub const fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl AudioProvider for YtDlpProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn available(&self) -> Availability {
        match self.extractor.check_available().await {
            Ok(_) => Availability::Available,
            Err(e) => Availability::Unavailable(e.to_string()),
        }
    }

    async fn resolve(
        &self,
        locator: &Locator,
        quality: QualityTier,
    ) -> Result<ResolvedAudio, ProviderError> {
        let stream = self
            .extractor
            .extract_url(locator.as_str(), quality.kbps())
            .await?;
        Ok(to_audio(stream))
    }
}

fn to_audio(stream: ExtractedStream) -> ResolvedAudio {
    let filename = stream.filename();

    let mut metadata = Map::new();
    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            metadata.insert(key.to_string(), value);
        }
    };
    put("id", stream.id.map(Value::from));
    put("title", stream.title.map(Value::from));
    put("ext", stream.ext.map(Value::from));
    put("abr", stream.abr.map(Value::from));
    put("duration", stream.duration.map(Value::from));
    put("uploader", stream.uploader.map(Value::from));
    put("thumbnail", stream.thumbnail.map(Value::from));
    put("formatId", stream.format_id.map(Value::from));
    put("filesize", stream.filesize.map(Value::from));

    ResolvedAudio {
        url: stream.url,
        filename,
        metadata,
    }
}
