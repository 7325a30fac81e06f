use crate::diagnostics::Diagnostics;
use crate::error::CaptionError;
use crate::youtube::{InnerTube, TrackKind, TranscriptService};
use crate::ytdlp::{HttpFetcher, MediaInfoTool, PayloadFetcher, YtDlp};
use crate::{Transcript, TranscriptSource, captions};

/// Caption languages tried in order when nothing else is configured
pub const DEFAULT_LANGUAGES: [&str; 4] = ["en", "en-US", "hi", "hi-IN"];

pub fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

/// Acquires a transcript by trying each caption source in priority order.
///
/// 1. human-authored tracks from the transcript service, per language
/// 2. auto-generated tracks from the transcript service, per language
/// 3. a caption track located through the media info tool
///
/// The first strategy producing a non-empty segment list wins.
pub struct CaptionClient<S = InnerTube, M = YtDlp, F = HttpFetcher> {
    service: S,
    media_info: M,
    fetcher: F,
    languages: Vec<String>,
}

impl CaptionClient {
    /// Client over InnerTube, `yt-dlp` and plain HTTP sharing one reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_sources(
            InnerTube::new(client.clone()),
            YtDlp::default(),
            HttpFetcher::new(client),
        )
    }
}

impl<S, M, F> CaptionClient<S, M, F>
where
    S: TranscriptService,
    M: MediaInfoTool,
    F: PayloadFetcher,
{
    pub fn with_sources(service: S, media_info: M, fetcher: F) -> Self {
        Self {
            service,
            media_info,
            fetcher,
            languages: default_languages(),
        }
    }

    /// Replace the language priority; an empty list keeps the current one.
    pub fn languages(mut self, languages: Vec<String>) -> Self {
        if !languages.is_empty() {
            self.languages = languages;
        }
        self
    }

    pub async fn fetch(&self, video_id: &str, diagnostics: &dyn Diagnostics) -> Result<Transcript, CaptionError> {
        if let Some(transcript) = self.from_transcript_service(video_id, diagnostics).await {
            return Ok(transcript);
        }

        diagnostics.info("Trying yt-dlp captions fallback");
        match self.from_media_info(video_id, diagnostics).await {
            Ok(transcript) => {
                diagnostics.info(&format!(
                    "yt-dlp extracted {} caption lines ({})",
                    transcript.segments.len(),
                    transcript.language
                ));
                return Ok(transcript);
            }
            Err(e) => diagnostics.warn(&format!("yt-dlp fallback failed: {e}")),
        }

        Err(CaptionError::NoTranscriptAvailable)
    }

    async fn from_transcript_service(&self, video_id: &str, diagnostics: &dyn Diagnostics) -> Option<Transcript> {
        let list = match self.service.list_tracks(video_id, diagnostics).await {
            Ok(list) => list,
            Err(e) => {
                diagnostics.warn(&format!("Listing transcripts failed: {e}"));
                return None;
            }
        };

        for (kind, source) in [
            (TrackKind::Manual, TranscriptSource::Manual),
            (TrackKind::Generated, TranscriptSource::Generated),
        ] {
            for code in &self.languages {
                let Some(track) = list.find(code, kind) else {
                    diagnostics.debug(&format!("No {source} transcript for {code}"));
                    continue;
                };

                match self.service.fetch_track(track, diagnostics).await {
                    Ok(segments) if !segments.is_empty() => {
                        diagnostics.info(&format!("{source} transcript ({code}): {} segments", segments.len()));
                        return Some(Transcript {
                            video_id: video_id.to_string(),
                            title: list.title.clone(),
                            language: track.language_code.clone(),
                            source,
                            segments,
                        });
                    }
                    Ok(_) => diagnostics.debug(&format!("{source} transcript ({code}) was empty")),
                    Err(e) => diagnostics.warn(&format!("{source} transcript ({code}) failed: {e}")),
                }
            }
        }

        None
    }

    async fn from_media_info(&self, video_id: &str, diagnostics: &dyn Diagnostics) -> Result<Transcript, CaptionError> {
        let info = self.media_info.video_info(video_id, diagnostics).await?;
        let track = info.choose_track(&self.languages)?;
        diagnostics.debug(&format!("yt-dlp track: {} ({:?})", track.language, track.ext));
        let payload = self.fetcher.fetch_payload(&track.url, diagnostics).await?;
        let segments = captions::parse(&payload)?;

        Ok(Transcript {
            video_id: video_id.to_string(),
            title: info.title.unwrap_or_default(),
            language: track.language,
            source: TranscriptSource::MediaInfo,
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use log::Level;

    use super::*;
    use crate::Segment;
    use crate::diagnostics::testing::RecordingDiagnostics;
    use crate::youtube::{CaptionTrack, TrackList};
    use crate::ytdlp::VideoInfo;

    /// Service whose per-track responses are keyed by base URL.
    #[derive(Default)]
    struct FakeService {
        list_error: bool,
        tracks: Vec<CaptionTrack>,
        responses: HashMap<String, Result<Vec<Segment>, String>>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn track(mut self, code: &str, kind: TrackKind, response: Result<Vec<Segment>, &str>) -> Self {
            let url = format!("{code}-{kind:?}");
            self.tracks.push(CaptionTrack {
                language_code: code.to_string(),
                kind,
                base_url: url.clone(),
            });
            self.responses.insert(url, response.map_err(|e| e.to_string()));
            self
        }
    }

    #[async_trait]
    impl TranscriptService for FakeService {
        async fn list_tracks(&self, _video_id: &str, _diagnostics: &dyn Diagnostics) -> Result<TrackList, CaptionError> {
            if self.list_error {
                return Err(CaptionError::TranscriptServiceUnavailable("transcripts disabled".to_string()));
            }
            Ok(TrackList {
                title: "Fake video".to_string(),
                tracks: self.tracks.clone(),
            })
        }

        async fn fetch_track(
            &self,
            track: &CaptionTrack,
            _diagnostics: &dyn Diagnostics,
        ) -> Result<Vec<Segment>, CaptionError> {
            self.fetched.lock().unwrap().push(track.base_url.clone());
            match &self.responses[&track.base_url] {
                Ok(segments) => Ok(segments.clone()),
                Err(e) => Err(CaptionError::TranscriptServiceUnavailable(e.clone())),
            }
        }
    }

    #[derive(Default)]
    struct FakeTool {
        json: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaInfoTool for FakeTool {
        async fn video_info(&self, _video_id: &str, _diagnostics: &dyn Diagnostics) -> Result<VideoInfo, CaptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.json {
                Some(json) => Ok(serde_json::from_str(json).unwrap()),
                None => Err(CaptionError::MediaInfoUnavailable("yt-dlp returned empty stdout".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        payload: &'static str,
        status: Option<u16>,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PayloadFetcher for FakeFetcher {
        async fn fetch_payload(&self, url: &str, diagnostics: &dyn Diagnostics) -> Result<String, CaptionError> {
            diagnostics.debug(&format!("Fetching caption payload: {url}"));
            self.urls.lock().unwrap().push(url.to_string());
            match self.status {
                Some(status) => Err(CaptionError::CaptionDownload(format!("HTTP status {status} for {url}"))),
                None => Ok(self.payload.to_string()),
            }
        }
    }

    fn segs(texts: &[&str]) -> Vec<Segment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Segment::new(*t, i as f64))
            .collect()
    }

    #[tokio::test]
    async fn test_manual_transcript_wins() {
        let service = FakeService::default()
            .track("hi", TrackKind::Manual, Ok(segs(&["namaste"])))
            .track("en", TrackKind::Generated, Ok(segs(&["auto"])));
        let client = CaptionClient::with_sources(service, FakeTool::default(), FakeFetcher::default());
        let diag = RecordingDiagnostics::default();

        let transcript = client.fetch("abcdefghijk", &diag).await.unwrap();
        assert_eq!(transcript.source, TranscriptSource::Manual);
        assert_eq!(transcript.language, "hi");
        assert_eq!(transcript.title, "Fake video");
        assert_eq!(transcript.segments, segs(&["namaste"]));
    }

    #[tokio::test]
    async fn test_manual_language_priority() {
        let service = FakeService::default()
            .track("hi", TrackKind::Manual, Ok(segs(&["hindi"])))
            .track("en-US", TrackKind::Manual, Ok(segs(&["us english"])));
        let client = CaptionClient::with_sources(service, FakeTool::default(), FakeFetcher::default());

        let transcript = client
            .fetch("abcdefghijk", &RecordingDiagnostics::default())
            .await
            .unwrap();
        assert_eq!(transcript.language, "en-US");
    }

    #[tokio::test]
    async fn test_generated_used_when_manual_fails() {
        let service = FakeService::default()
            .track("en", TrackKind::Manual, Err("boom"))
            .track("en-US", TrackKind::Manual, Err("boom"))
            .track("hi", TrackKind::Manual, Err("boom"))
            .track("hi-IN", TrackKind::Manual, Err("boom"))
            .track("en", TrackKind::Generated, Ok(segs(&["auto", "english"])));
        let tool = FakeTool::default();
        let client = CaptionClient::with_sources(service, tool, FakeFetcher::default());
        let diag = RecordingDiagnostics::default();

        let transcript = client.fetch("abcdefghijk", &diag).await.unwrap();
        assert_eq!(transcript.source, TranscriptSource::Generated);
        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.segments, segs(&["auto", "english"]));
        assert_eq!(client.media_info.calls.load(Ordering::SeqCst), 0);
        assert_eq!(diag.messages(Level::Warn).len(), 4);
        assert_eq!(
            *client.service.fetched.lock().unwrap(),
            vec!["en-Manual", "en-US-Manual", "hi-Manual", "hi-IN-Manual", "en-Generated"]
        );
    }

    #[tokio::test]
    async fn test_empty_fetch_moves_to_next_language() {
        let service = FakeService::default()
            .track("en", TrackKind::Manual, Ok(vec![]))
            .track("hi-IN", TrackKind::Manual, Ok(segs(&["found"])));
        let client = CaptionClient::with_sources(service, FakeTool::default(), FakeFetcher::default());

        let transcript = client
            .fetch("abcdefghijk", &RecordingDiagnostics::default())
            .await
            .unwrap();
        assert_eq!(transcript.language, "hi-IN");
    }

    #[tokio::test]
    async fn test_media_info_fallback() {
        let service = FakeService {
            list_error: true,
            ..Default::default()
        };
        let tool = FakeTool {
            json: Some(
                r#"{"title": "Fallback", "automatic_captions": {"en": [{"ext": "vtt", "url": "https://caps/en.vtt"}]}}"#,
            ),
            ..Default::default()
        };
        let fetcher = FakeFetcher {
            payload: "WEBVTT\n\n00:00:01.500 --> 00:00:03.000\nHello there\n",
            ..Default::default()
        };
        let client = CaptionClient::with_sources(service, tool, fetcher);
        let diag = RecordingDiagnostics::default();

        let transcript = client.fetch("abcdefghijk", &diag).await.unwrap();
        assert_eq!(transcript.source, TranscriptSource::MediaInfo);
        assert_eq!(transcript.title, "Fallback");
        assert_eq!(transcript.segments, vec![Segment::new("Hello there", 1.5)]);
        assert_eq!(*client.fetcher.urls.lock().unwrap(), vec!["https://caps/en.vtt"]);
        assert!(
            diag.messages(Level::Warn)
                .iter()
                .any(|m| m.contains("transcripts disabled"))
        );
    }

    #[tokio::test]
    async fn test_total_failure_single_terminal_error() {
        let service = FakeService::default()
            .track("en", TrackKind::Manual, Err("boom"))
            .track("en", TrackKind::Generated, Ok(vec![]));
        let tool = FakeTool {
            json: Some(r#"{"subtitles": {"en": [{"ext": "vtt", "url": "https://caps/en.vtt"}]}}"#),
            ..Default::default()
        };
        let fetcher = FakeFetcher {
            payload: "<html>not captions</html>",
            ..Default::default()
        };
        let client = CaptionClient::with_sources(service, tool, fetcher);
        let diag = RecordingDiagnostics::default();

        let err = client.fetch("abcdefghijk", &diag).await.unwrap_err();
        assert!(matches!(err, CaptionError::NoTranscriptAvailable));
        assert!(err.to_string().contains("try a different video with captions enabled"));
        assert_eq!(client.media_info.calls.load(Ordering::SeqCst), 1);
        assert!(
            diag.messages(Level::Warn)
                .iter()
                .any(|m| m.contains("unparseable caption payload"))
        );
    }

    #[tokio::test]
    async fn test_payload_download_failure_is_terminal() {
        let service = FakeService {
            list_error: true,
            ..Default::default()
        };
        let tool = FakeTool {
            json: Some(r#"{"subtitles": {"en": [{"ext": "vtt", "url": "https://caps/en.vtt"}]}}"#),
            ..Default::default()
        };
        let fetcher = FakeFetcher {
            status: Some(403),
            ..Default::default()
        };
        let client = CaptionClient::with_sources(service, tool, fetcher);
        let diag = RecordingDiagnostics::default();

        let err = client.fetch("abcdefghijk", &diag).await.unwrap_err();
        assert!(matches!(err, CaptionError::NoTranscriptAvailable));
        assert_eq!(*client.fetcher.urls.lock().unwrap(), vec!["https://caps/en.vtt"]);
        assert!(
            diag.messages(Level::Warn)
                .iter()
                .any(|m| m.contains("caption download failed: HTTP status 403"))
        );
        assert!(
            diag.messages(Level::Debug)
                .contains(&"Fetching caption payload: https://caps/en.vtt".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_transcript_text_from_url() {
        let service = FakeService::default().track(
            "en",
            TrackKind::Manual,
            Ok(vec![Segment::new(" Hello ", 0.0), Segment::new("", 1.0), Segment::new("world", 2.0)]),
        );
        let client = CaptionClient::with_sources(service, FakeTool::default(), FakeFetcher::default());

        let text = crate::get_transcript_text(
            &client,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
            &RecordingDiagnostics::default(),
        )
        .await
        .unwrap();
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn test_custom_languages() {
        let service = FakeService::default()
            .track("en", TrackKind::Manual, Ok(segs(&["english"])))
            .track("fr", TrackKind::Manual, Ok(segs(&["french"])));
        let client = CaptionClient::with_sources(service, FakeTool::default(), FakeFetcher::default())
            .languages(vec!["fr".to_string()]);

        let transcript = client
            .fetch("abcdefghijk", &RecordingDiagnostics::default())
            .await
            .unwrap();
        assert_eq!(transcript.language, "fr");
    }
}
