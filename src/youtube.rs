use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::Segment;
use crate::diagnostics::Diagnostics;
use crate::error::CaptionError;

pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Whether a track was written by a person or generated by speech recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Manual,
    Generated,
}

/// A caption track advertised by the transcript service
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub kind: TrackKind,
    pub base_url: String,
}

/// Caption tracks available for one video
#[derive(Debug, Clone, Default)]
pub struct TrackList {
    pub title: String,
    pub tracks: Vec<CaptionTrack>,
}

impl TrackList {
    /// Find the track for an exact language code and kind.
    pub fn find(&self, language_code: &str, kind: TrackKind) -> Option<&CaptionTrack> {
        self.tracks
            .iter()
            .find(|t| t.kind == kind && t.language_code == language_code)
    }
}

/// A structured transcript service keyed by video ID and language.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// List the caption tracks published for a video.
    async fn list_tracks(&self, video_id: &str, diagnostics: &dyn Diagnostics) -> Result<TrackList, CaptionError>;

    /// Download and parse one track.
    async fn fetch_track(
        &self,
        track: &CaptionTrack,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Vec<Segment>, CaptionError>;
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
    #[serde(rename = "videoDetails")]
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoDetails {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<InnerTubeTrack>>,
}

#[derive(Debug, Deserialize)]
struct InnerTubeTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    kind: Option<String>,
}

impl From<InnerTubeTrack> for CaptionTrack {
    fn from(t: InnerTubeTrack) -> Self {
        let kind = match t.kind.as_deref() {
            Some("asr") => TrackKind::Generated,
            _ => TrackKind::Manual,
        };
        CaptionTrack {
            language_code: t.language_code,
            kind,
            base_url: t.base_url,
        }
    }
}

/// Transcript service backed by YouTube's InnerTube player API
#[derive(Debug, Clone)]
pub struct InnerTube {
    client: reqwest::Client,
}

impl InnerTube {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TranscriptService for InnerTube {
    async fn list_tracks(&self, video_id: &str, diagnostics: &dyn Diagnostics) -> Result<TrackList, CaptionError> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        diagnostics.debug(&format!("Fetching watch page: {watch_url}"));

        let page_html = self
            .client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        diagnostics.debug(&format!("Extracted InnerTube API key: {api_key}"));

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": "en",
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(track_list(resp))
    }

    async fn fetch_track(
        &self,
        track: &CaptionTrack,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Vec<Segment>, CaptionError> {
        diagnostics.debug(&format!(
            "Fetching caption track: lang={} kind={:?}",
            track.language_code, track.kind
        ));

        let caption_xml = self
            .client
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

fn track_list(resp: InnerTubePlayerResponse) -> TrackList {
    let title = resp
        .video_details
        .as_ref()
        .and_then(|vd| vd.title.clone())
        .unwrap_or_default();

    let tracks = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default()
        .into_iter()
        .map(CaptionTrack::from)
        .collect();

    TrackList { title, tracks }
}

fn extract_api_key(html: &str) -> Result<String, CaptionError> {
    let patterns = [r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#, r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#];

    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| CaptionError::TranscriptServiceUnavailable(e.to_string()))?;
        if let Some(caps) = re.captures(html) {
            return Ok(caps[1].to_string());
        }
    }

    Err(CaptionError::TranscriptServiceUnavailable(
        "could not extract InnerTube API key from watch page".to_string(),
    ))
}

/// Parse timed-text XML: `<text start dur>` in seconds or `<p t d>` in milliseconds.
fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, CaptionError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<(f64, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                let millis = e.name().as_ref() == b"p";
                let mut start = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                    match attr.key.as_ref() {
                        b"start" if !millis => start = value,
                        b"t" if millis => start = value.map(|ms| ms / 1000.0),
                        _ => {}
                    }
                }
                current = start.map(|s| (s, String::new()));
            }
            Ok(Event::Text(ref e)) => {
                if let Some((_, ref mut buf)) = current {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    buf.push_str(&html_escape::decode_html_entities(&raw_text));
                }
            }
            Ok(Event::End(ref e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                if let Some((start, text)) = current.take() {
                    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !text.is_empty() {
                        segments.push(Segment { text, start });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CaptionError::UnparseableCaptionPayload(format!(
                    "error parsing caption XML: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(segments)
}
