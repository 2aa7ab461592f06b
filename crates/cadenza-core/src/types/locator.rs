//! Media locator validation.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::{Error, Result};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// A validated media locator.
///
/// Accepts `http(s)` URLs. The video id is extracted when the URL points at
/// `YouTube`.
///
/// Input that does not parse as a URL is tried as a bare video id. Ids carry
/// no checksum, so any 11-character token over `[A-Za-z0-9_-]` (including a
/// word such as `hello_world`) is taken for one and expanded to a watch URL.
/// Whether the video exists is left to the providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    url: String,
    video_id: Option<String>,
}

impl Locator {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("locator is required".to_string()));
        }

        let parsed = match Url::parse(input) {
            Ok(parsed) => parsed,
            Err(_) if is_video_id(input) => {
                return Ok(Self {
                    url: format!("{WATCH_URL}{input}"),
                    video_id: Some(input.to_string()),
                });
            }
            Err(e) => {
                return Err(Error::InvalidInput(format!(
                    "locator is not a valid URL: {e}"
                )));
            }
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidInput(format!(
                "unsupported locator scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            video_id: youtube_video_id(&parsed),
            url: input.to_string(),
        })
    }

    /// The locator URL as given (trimmed), or the expanded watch URL.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The `YouTube` video id, if one could be extracted.
    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches("www.");
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            "shorts" | "embed" | "live" | "v" => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}
