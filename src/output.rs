use eyre::Result;

use crate::Transcript;

/// Render transcript as a single flattened paragraph
pub fn render_text(transcript: &Transcript) -> String {
    transcript.text()
}

/// Render transcript with metadata and segments as pretty JSON
pub fn render_json(transcript: &Transcript) -> Result<String> {
    Ok(serde_json::to_string_pretty(transcript)?)
}

/// Thumbnail image for a video
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/0.jpg")
}

/// One-line description shown once the transcript is ready
pub fn render_summary_line(transcript: &Transcript) -> String {
    let words = transcript.text().split_whitespace().count();
    format!(
        "Transcript extracted: {words} words, {} segments ({} captions, {})",
        transcript.segments.len(),
        transcript.source,
        transcript.language,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Segment, TranscriptSource};

    fn sample_transcript() -> Transcript {
        Transcript {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "Test Video".to_string(),
            language: "en".to_string(),
            source: TranscriptSource::Generated,
            segments: vec![
                Segment::new("Hello world", 0.0),
                Segment::new("  ", 1.0),
                Segment::new("This is a test", 1.5),
            ],
        }
    }

    #[test]
    fn test_render_text() {
        let t = sample_transcript();
        assert_eq!(render_text(&t), "Hello world This is a test");
    }

    #[test]
    fn test_render_text_empty() {
        let t = Transcript {
            segments: vec![],
            ..sample_transcript()
        };
        assert_eq!(render_text(&t), "");
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&sample_transcript()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["video_id"], "dQw4w9WgXcQ");
        assert_eq!(value["source"], "generated");
        assert_eq!(value["segments"][2]["start"], 1.5);
    }

    #[test]
    fn test_thumbnail_url() {
        assert_eq!(thumbnail_url("dQw4w9WgXcQ"), "https://img.youtube.com/vi/dQw4w9WgXcQ/0.jpg");
    }

    #[test]
    fn test_render_summary_line() {
        let line = render_summary_line(&sample_transcript());
        assert_eq!(
            line,
            "Transcript extracted: 6 words, 3 segments (generated captions, en)"
        );
    }
}
