use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::Segment;
use crate::error::CaptionError;

/// Synthetic spacing given to SRT entries, which carry no retained timestamp.
/// This is an approximation, not a recovered timing.
pub const SRT_SYNTHETIC_SPACING_SECS: f64 = 4.0;

static VTT_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\d{2}):(\d{2}):(\d{2}\.\d{3}) --> .*?\n(.*?)\n").unwrap());

static SRT_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\s+\d{2}:\d{2}:\d{2},\d{3}").unwrap());

static SRT_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\d+\s+\d{2}:\d{2}:\d{2},\d{3} --> .*?\n(.*?)\n\n").unwrap());

/// Caption payload serializations understood by [`parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    WebVtt,
    Json3,
    Srt,
}

impl PayloadKind {
    /// Sniff the payload kind; the first matching precondition wins.
    pub fn detect(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_start();
        if raw.contains("WEBVTT") {
            Some(PayloadKind::WebVtt)
        } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
            Some(PayloadKind::Json3)
        } else if SRT_MARKER.is_match(raw) {
            Some(PayloadKind::Srt)
        } else {
            None
        }
    }

    fn parse(self, raw: &str) -> Result<Vec<Segment>, CaptionError> {
        match self {
            PayloadKind::WebVtt => Ok(parse_vtt(raw)),
            PayloadKind::Json3 => parse_json3(raw),
            PayloadKind::Srt => Ok(parse_srt(raw)),
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadKind::WebVtt => write!(f, "webvtt"),
            PayloadKind::Json3 => write!(f, "json3"),
            PayloadKind::Srt => write!(f, "srt"),
        }
    }
}

/// Parse a raw caption payload into ordered segments.
///
/// Fails when no payload kind matches or the matched kind yields no segments.
pub fn parse(raw: &str) -> Result<Vec<Segment>, CaptionError> {
    let normalized = raw.replace("\r\n", "\n");
    let kind = PayloadKind::detect(&normalized)
        .ok_or_else(|| CaptionError::UnparseableCaptionPayload("unrecognized caption format".to_string()))?;

    let segments = kind.parse(&normalized)?;
    if segments.is_empty() {
        return Err(CaptionError::UnparseableCaptionPayload(format!(
            "{kind} payload contained no caption lines"
        )));
    }
    Ok(segments)
}

fn parse_vtt(raw: &str) -> Vec<Segment> {
    // The last cue is only matched when its text line is terminated
    let padded = format!("{}\n", raw.trim_end());
    VTT_CUE
        .captures_iter(&padded)
        .filter_map(|caps| {
            let h: f64 = caps[1].parse().ok()?;
            let m: f64 = caps[2].parse().ok()?;
            let s: f64 = caps[3].parse().ok()?;
            Some(Segment {
                text: caps[4].trim().to_string(),
                start: h * 3600.0 + m * 60.0 + s,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Json3Payload {
    Document {
        #[serde(default)]
        events: Vec<Json3Event>,
    },
    Events(Vec<Json3Event>),
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<f64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

fn parse_json3(raw: &str) -> Result<Vec<Segment>, CaptionError> {
    let payload: Json3Payload = serde_json::from_str(raw)
        .map_err(|e| CaptionError::UnparseableCaptionPayload(format!("invalid json3 payload: {e}")))?;

    let events = match payload {
        Json3Payload::Document { events } => events,
        Json3Payload::Events(events) => events,
    };

    Ok(events
        .into_iter()
        .filter_map(|ev| {
            let segs = ev.segs.filter(|s| !s.is_empty())?;
            let text = segs.iter().map(|s| s.utf8.as_str()).collect::<String>().trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(Segment {
                text,
                start: ev.t_start_ms.unwrap_or(0.0) / 1000.0,
            })
        })
        .collect())
}

fn parse_srt(raw: &str) -> Vec<Segment> {
    // The last cue is only matched when followed by a blank line
    let padded = format!("{}\n\n", raw.trim_end());
    SRT_ENTRY
        .captures_iter(&padded)
        .enumerate()
        .map(|(i, caps)| Segment {
            text: caps[1].split_whitespace().collect::<Vec<_>>().join(" "),
            start: i as f64 * SRT_SYNTHETIC_SPACING_SECS,
        })
        .collect()
}
