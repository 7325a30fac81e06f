pub mod captions;
pub mod chain;
pub mod chunk;
pub mod config;
pub mod diagnostics;
pub mod embed;
pub mod error;
pub mod fetch;
pub mod index;
pub mod llm;
pub mod output;
pub mod youtube;
pub mod ytdlp;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use diagnostics::Diagnostics;
use error::CaptionError;

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
}

impl Segment {
    pub fn new(text: impl Into<String>, start: f64) -> Self {
        Self {
            text: text.into(),
            start,
        }
    }
}

/// Where the transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptSource {
    /// Human-authored captions from the transcript service
    Manual,
    /// Auto-generated captions from the transcript service
    Generated,
    /// Caption track located through the media info tool
    MediaInfo,
}

/// Complete transcript for a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    pub title: String,
    pub language: String,
    pub source: TranscriptSource,
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn text(&self) -> String {
        transcript_to_text(&self.segments)
    }
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptSource::Manual => write!(f, "manual"),
            TranscriptSource::Generated => write!(f, "generated"),
            TranscriptSource::MediaInfo => write!(f, "media-info"),
        }
    }
}

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").unwrap());

/// Extract the 11-character video ID from a watch, short or embed URL.
///
/// Input without a recognizable ID is returned trimmed, as if it were
/// already an ID; bad input only surfaces once caption acquisition fails.
pub fn extract_video_id(input: &str) -> String {
    match VIDEO_ID.captures(input) {
        Some(caps) => caps[1].to_string(),
        None => input.trim().to_string(),
    }
}

/// Flatten segments into a single space-joined string, dropping empty text.
pub fn transcript_to_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the ID, fetch the transcript and flatten it in one call.
pub async fn get_transcript_text<S, M, F>(
    client: &fetch::CaptionClient<S, M, F>,
    url: &str,
    diagnostics: &dyn Diagnostics,
) -> Result<String, CaptionError>
where
    S: youtube::TranscriptService,
    M: ytdlp::MediaInfoTool,
    F: ytdlp::PayloadFetcher,
{
    let video_id = extract_video_id(url);
    let transcript = client.fetch(&video_id, diagnostics).await?;
    Ok(transcript.text())
}
