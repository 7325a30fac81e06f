use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::diagnostics::Diagnostics;
use crate::error::CaptionError;
use crate::youtube::USER_AGENT;

/// Caption formats tried first when a track offers several.
const PREFERRED_EXTS: [&str; 3] = ["json3", "vtt", "srt"];

/// Video metadata as printed by `yt-dlp -J`, reduced to what caption lookup needs.
///
/// Track maps keep document order so "first available track" is well defined.
#[derive(Debug, Default, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub subtitles: Option<Map<String, Value>>,
    pub automatic_captions: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionFormat {
    pub url: Option<String>,
    pub ext: Option<String>,
}

/// The track chosen from a [`VideoInfo`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChosenTrack {
    pub language: String,
    pub url: String,
    pub ext: Option<String>,
}

impl VideoInfo {
    /// Manual subtitles when present, otherwise automatic captions.
    fn caption_map(&self) -> Option<&Map<String, Value>> {
        self.subtitles
            .as_ref()
            .filter(|m| !m.is_empty())
            .or_else(|| self.automatic_captions.as_ref().filter(|m| !m.is_empty()))
    }

    /// Pick the track matching the language priority, else the first one listed.
    pub fn choose_track(&self, languages: &[String]) -> Result<ChosenTrack, CaptionError> {
        let map = self
            .caption_map()
            .ok_or_else(|| CaptionError::NoCaptionsFound("yt-dlp lists no subtitles or captions".to_string()))?;

        let (language, formats) = languages
            .iter()
            .find_map(|code| map.get(code.as_str()).map(|formats| (code, formats)))
            .or_else(|| map.iter().next())
            .ok_or_else(|| CaptionError::NoCaptionsFound("empty caption map".to_string()))?;

        let formats: Vec<CaptionFormat> = serde_json::from_value(formats.clone())
            .map_err(|e| CaptionError::NoCaptionsFound(format!("malformed formats for {language}: {e}")))?;

        let format = PREFERRED_EXTS
            .iter()
            .find_map(|ext| {
                formats
                    .iter()
                    .find(|f| f.url.is_some() && f.ext.as_deref() == Some(*ext))
            })
            .or_else(|| formats.iter().find(|f| f.url.is_some()))
            .ok_or_else(|| CaptionError::NoCaptionsFound(format!("no downloadable format for {language}")))?;

        Ok(ChosenTrack {
            language: language.clone(),
            url: format.url.clone().unwrap_or_default(),
            ext: format.ext.clone(),
        })
    }
}

/// A generic media info tool that describes a video and its caption tracks.
#[async_trait]
pub trait MediaInfoTool: Send + Sync {
    async fn video_info(&self, video_id: &str, diagnostics: &dyn Diagnostics) -> Result<VideoInfo, CaptionError>;
}

/// Downloads a raw caption payload.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch_payload(&self, url: &str, diagnostics: &dyn Diagnostics) -> Result<String, CaptionError>;
}

/// `yt-dlp` invoked as a subprocess
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl MediaInfoTool for YtDlp {
    async fn video_info(&self, video_id: &str, diagnostics: &dyn Diagnostics) -> Result<VideoInfo, CaptionError> {
        let url = format!("https://www.youtube.com/watch?v={video_id}");
        diagnostics.debug(&format!("Running {} -J {url}", self.program));

        let output = tokio::process::Command::new(&self.program)
            .args(["-J", "--no-warnings", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CaptionError::MediaInfoUnavailable(format!(
                        "{} not found. Install it to enable the captions fallback:\n  \
                         pip install yt-dlp\n  \
                         or: brew install yt-dlp",
                        self.program
                    ))
                } else {
                    CaptionError::MediaInfoUnavailable(format!("failed to run {}: {e}", self.program))
                }
            })?;

        parse_video_info(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `yt-dlp -J` output. The exit status is ignored; only stdout matters.
fn parse_video_info(stdout: &str) -> Result<VideoInfo, CaptionError> {
    if stdout.trim().is_empty() {
        return Err(CaptionError::MediaInfoUnavailable("yt-dlp returned empty stdout".to_string()));
    }
    serde_json::from_str(stdout)
        .map_err(|e| CaptionError::MediaInfoUnavailable(format!("invalid yt-dlp JSON: {e}")))
}

/// Payload fetcher over plain HTTP GET
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PayloadFetcher for HttpFetcher {
    async fn fetch_payload(&self, url: &str, diagnostics: &dyn Diagnostics) -> Result<String, CaptionError> {
        diagnostics.debug(&format!("Fetching caption payload: {url}"));
        let download = |e: reqwest::Error| CaptionError::CaptionDownload(e.to_string());

        self.client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(download)?
            .error_for_status()
            .map_err(download)?
            .text()
            .await
            .map_err(download)
    }
}
