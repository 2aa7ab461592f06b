//! # cadenza-extractor
//!
//! Direct audio URL extraction for Cadenza using yt-dlp.
//!
//! yt-dlp is an optional local tool. The binary is discovered once, checked
//! with `--version`, and then asked for a single-format JSON dump whose `url`
//! field is the direct audio URL.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use cadenza_core::{download_filename, Error, Result};

/// Default upper bound on one yt-dlp run.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Authentication method for yt-dlp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthMethod {
    /// Use cookies from a browser (helps with age-gated or region-locked videos).
    BrowserCookies(String),
    /// No authentication.
    #[default]
    None,
}

impl AuthMethod {
    fn to_args(&self) -> Vec<String> {
        match self {
            Self::BrowserCookies(browser) => {
                vec!["--cookies-from-browser".to_string(), browser.clone()]
            }
            Self::None => vec![],
        }
    }
}

/// Direct stream selected by yt-dlp.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedStream {
    /// Direct media URL.
    pub url: String,
    /// Video id.
    pub id: Option<String>,
    /// Title of the track.
    pub title: Option<String>,
    /// Container extension (`m4a`, `webm`, ...).
    pub ext: Option<String>,
    /// Average audio bitrate in kbps.
    pub abr: Option<f64>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
    pub format_id: Option<String>,
    pub filesize: Option<u64>,
}

impl ExtractedStream {
    /// Suggested download filename (`<title>.<ext>`).
    pub fn filename(&self) -> Option<String> {
        let title = self.title.as_deref()?;
        Some(download_filename(title, self.ext.as_deref().unwrap_or("audio")))
    }
}

/// yt-dlp wrapper used to resolve direct audio URLs.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone)]
pub struct Extractor {
    yt_dlp_path: PathBuf,
    auth_method: AuthMethod,
    timeout: Duration,
}

impl Extractor {
    /// Create an extractor using the discovered yt-dlp binary.
    pub fn new() -> Self {
        Self::with_path(Self::discover().unwrap_or_else(|| PathBuf::from("yt-dlp")))
    }

    /// Create an extractor for a specific yt-dlp binary.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: path.into(),
            auth_method: AuthMethod::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Locate yt-dlp: the app cache directory first, then `$PATH`.
    pub fn discover() -> Option<PathBuf> {
        let cached = directories::ProjectDirs::from("", "", "cadenza")
            .map(|d| d.cache_dir().join("yt-dlp"))
            .filter(|p| p.is_file());

        cached.or_else(|| which::which("yt-dlp").ok())
    }

    /// Set browser cookies as the authentication method.
    #[must_use]
    pub fn with_browser_cookies(mut self, browser: impl Into<String>) -> Self {
        self.auth_method = AuthMethod::BrowserCookies(browser.into());
        self
    }

    /// Bound each yt-dlp run.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the binary with `--version`. Returns the reported version.
    pub async fn check_available(&self) -> Result<String> {
        let output = Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| Error::ToolUnavailable("yt-dlp --version timed out".to_string()))?
            .map_err(|e| {
                Error::ToolUnavailable(format!(
                    "failed to run {}: {e}",
                    self.yt_dlp_path.display()
                ))
            })?;

        if !output.status.success() {
            return Err(Error::ToolUnavailable(format!(
                "{} --version exited with {}",
                self.yt_dlp_path.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("yt-dlp {version} at {}", self.yt_dlp_path.display());
        Ok(version)
    }

    /// Resolve the best audio-only format at or below `max_kbps` for a URL.
    pub async fn extract_url(&self, url: &str, max_kbps: u32) -> Result<ExtractedStream> {
        let mut args = self.auth_method.to_args();
        args.extend([
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--no-playlist".to_string(),
            "--skip-download".to_string(),
            "--dump-single-json".to_string(),
            "-f".to_string(),
            format_selector(max_kbps),
            "--".to_string(),
            url.to_string(),
        ]);

        debug!("Running yt-dlp for {url} at <= {max_kbps}kbps");

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ToolUnavailable(format!(
                        "yt-dlp not found at {}",
                        self.yt_dlp_path.display()
                    ))
                } else {
                    Error::ExtractionFailed(format!("Failed to run yt-dlp: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp stderr: {}", stderr.trim());
            let first = stderr
                .lines()
                .find(|l| l.starts_with("ERROR"))
                .or_else(|| stderr.lines().next())
                .unwrap_or("Unknown error")
                .to_string();
            return Err(if first.contains("Requested format is not available") {
                Error::ContentNotAvailable(first)
            } else {
                Error::ExtractionFailed(first)
            });
        }

        parse_dump(&output.stdout)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

/// yt-dlp format selector for audio-only streams within a bitrate ceiling.
fn format_selector(max_kbps: u32) -> String {
    format!("bestaudio[abr<={max_kbps}]/bestaudio[tbr<={max_kbps}]")
}

fn parse_dump(stdout: &[u8]) -> Result<ExtractedStream> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::ExtractionFailed(
            "yt-dlp returned empty output".to_string(),
        ));
    }

    let stream: ExtractedStream = serde_json::from_slice(stdout)
        .map_err(|e| Error::ParseError(format!("yt-dlp JSON: {e}")))?;

    if stream.url.is_empty() {
        return Err(Error::ParseError("yt-dlp JSON has no url".to_string()));
    }

    Ok(stream)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    const DUMP: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Artist - Song: Live/Remix",
        "ext": "m4a",
        "abr": 129.5,
        "duration": 213.0,
        "uploader": "Artist",
        "thumbnail": "https://i.example/max.jpg",
        "format_id": "140",
        "url": "https://rr.example/videoplayback?itag=140",
        "formats": []
    }"#;

    #[test]
    fn test_extractor_creation() {
        let extractor = Extractor::with_path("/opt/yt-dlp");
        assert_eq!(extractor.auth_method, AuthMethod::None);
        assert_eq!(extractor.yt_dlp_path, Path::new("/opt/yt-dlp"));

        let extractor = extractor.with_browser_cookies("firefox");
        assert_eq!(
            extractor.auth_method,
            AuthMethod::BrowserCookies("firefox".into())
        );
    }

    #[test]
    fn test_auth_args() {
        assert_eq!(
            AuthMethod::BrowserCookies("firefox".into()).to_args(),
            vec!["--cookies-from-browser", "firefox"]
        );
        assert!(AuthMethod::None.to_args().is_empty());
    }

    #[test]
    fn test_format_selector() {
        assert_eq!(
            format_selector(128),
            "bestaudio[abr<=128]/bestaudio[tbr<=128]"
        );
    }

    #[test]
    fn test_parse_dump() {
        let stream = parse_dump(DUMP.as_bytes()).unwrap();
        assert_eq!(stream.url, "https://rr.example/videoplayback?itag=140");
        assert_eq!(stream.format_id.as_deref(), Some("140"));
        assert_eq!(stream.filename().as_deref(), Some("Artist - Song_ Live_Remix.m4a"));
    }

    #[test]
    fn test_parse_dump_rejects_empty_and_garbage() {
        assert!(matches!(parse_dump(b"  \n"), Err(Error::ExtractionFailed(_))));
        assert!(matches!(parse_dump(b"{\"title\":1}"), Err(Error::ParseError(_))));
        assert!(matches!(parse_dump(br#"{"url":""}"#), Err(Error::ParseError(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let extractor = Extractor::with_path("/nonexistent/cadenza/yt-dlp");
        assert!(matches!(
            extractor.check_available().await,
            Err(Error::ToolUnavailable(_))
        ));
        assert!(matches!(
            extractor.extract_url("https://youtu.be/dQw4w9WgXcQ", 320).await,
            Err(Error::ToolUnavailable(_))
        ));
    }

    #[cfg(unix)]
    fn fake_yt_dlp(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_with_fake_binary() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!(
            "if [ \"$1\" = \"--version\" ]; then echo 2024.12.13; exit 0; fi\ncat <<'JSON'\n{DUMP}\nJSON"
        );
        let extractor = Extractor::with_path(fake_yt_dlp(dir.path(), &script));

        assert_eq!(extractor.check_available().await.unwrap(), "2024.12.13");
        let stream = extractor
            .extract_url("https://youtu.be/dQw4w9WgXcQ", 128)
            .await
            .unwrap();
        assert_eq!(stream.abr, Some(129.5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_format_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let script = "echo 'ERROR: [youtube] dQw4w9WgXcQ: Requested format is not available' >&2\nexit 1";
        let extractor = Extractor::with_path(fake_yt_dlp(dir.path(), script));

        let err = extractor
            .extract_url("https://youtu.be/dQw4w9WgXcQ", 92)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContentNotAvailable(_)));
    }
}
