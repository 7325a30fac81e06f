use thiserror::Error;

/// Failures raised while acquiring and parsing captions.
///
/// Only [`CaptionError::NoTranscriptAvailable`] ever reaches the caller of
/// [`crate::fetch::CaptionClient::fetch`]; every other variant is reported
/// through the diagnostics sink at the step that produced it.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("transcript service unavailable: {0}")]
    TranscriptServiceUnavailable(String),

    #[error("media info tool failed: {0}")]
    MediaInfoUnavailable(String),

    #[error("no captions found: {0}")]
    NoCaptionsFound(String),

    #[error("caption download failed: {0}")]
    CaptionDownload(String),

    #[error("unparseable caption payload: {0}")]
    UnparseableCaptionPayload(String),

    #[error(
        "No transcript available via API or captions fallback.\n\
         Please try a different video with captions enabled (English or Hindi)."
    )]
    NoTranscriptAvailable,
}

impl From<reqwest::Error> for CaptionError {
    fn from(e: reqwest::Error) -> Self {
        CaptionError::TranscriptServiceUnavailable(e.to_string())
    }
}
