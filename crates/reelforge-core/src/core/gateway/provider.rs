//! Generative Gateway Trait
//!
//! Request/response models and the provider abstraction for text, image,
//! video, and music generation. The production implementation talks to the
//! relay service; `MockGateway` scripts responses for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::{AspectRatio, CoreResult, ImageData, JobId};

// =============================================================================
// Model catalog
// =============================================================================

/// Video model used when a request does not pick one.
pub const DEFAULT_VIDEO_MODEL: &str = "veo3.1-pro";

/// Models that accept only a single reference frame; an end frame is
/// dropped before submission.
pub const SINGLE_FRAME_VIDEO_MODELS: &[&str] = &["veo3-pro-frames"];

/// Selectable video models with display labels.
pub const VIDEO_MODELS: &[(&str, &str)] = &[
    ("veo3.1", "Veo 3.1 (Fast)"),
    ("veo3.1-pro", "Veo 3.1 Pro (High Quality)"),
    ("veo3-pro-frames", "Veo 3 Pro Frames"),
    ("veo3-fast-frames", "Veo 3 Fast Frames"),
    ("veo2-fast-frames", "Veo 2 Fast Frames"),
    ("veo2-fast-components", "Veo 2 Fast Components"),
    ("veo3.1-components", "Veo 3.1 Components"),
];

// =============================================================================
// Request types
// =============================================================================

/// One part of a multimodal prompt, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPart {
    Text(String),
    Image(ImageData),
}

/// A text (chat) generation request.
#[derive(Debug, Clone, Default)]
pub struct TextRequest {
    /// Ordered prompt parts; images are interleaved with text.
    pub parts: Vec<ContentPart>,
    /// Request a JSON object response from the model.
    pub json_output: bool,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![ContentPart::Text(prompt.into())],
            json_output: false,
        }
    }

    pub fn from_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            parts,
            json_output: false,
        }
    }

    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    /// All text parts joined with newlines.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An image generation request.
///
/// With an image part present this becomes an edit (image-to-image) call;
/// otherwise a plain generation. Only the first image part is sent.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub parts: Vec<ContentPart>,
    pub aspect: AspectRatio,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, aspect: AspectRatio) -> Self {
        Self {
            parts: vec![ContentPart::Text(prompt.into())],
            aspect,
        }
    }

    pub fn from_parts(parts: Vec<ContentPart>, aspect: AspectRatio) -> Self {
        Self { parts, aspect }
    }

    /// All text parts joined with newlines; the effective prompt.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First image part, if any.
    pub fn first_image(&self) -> Option<&ImageData> {
        self.parts.iter().find_map(|part| match part {
            ContentPart::Image(image) => Some(image),
            ContentPart::Text(_) => None,
        })
    }

    pub fn has_image_input(&self) -> bool {
        self.first_image().is_some()
    }
}

/// A video generation request.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    /// Model id; empty selections fall back to [`DEFAULT_VIDEO_MODEL`].
    pub model: String,
    pub prompt: String,
    pub aspect: AspectRatio,
    /// Start reference frame.
    pub start_frame: Option<ImageData>,
    /// End reference frame.
    pub end_frame: Option<ImageData>,
}

impl VideoRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_VIDEO_MODEL.to_string(),
            prompt: prompt.into(),
            aspect: AspectRatio::Widescreen,
            start_frame: None,
            end_frame: None,
        }
    }

    /// Sets the model id. An empty selection keeps the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_aspect(mut self, aspect: AspectRatio) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_start_frame(mut self, frame: ImageData) -> Self {
        self.start_frame = Some(frame);
        self
    }

    pub fn with_end_frame(mut self, frame: ImageData) -> Self {
        self.end_frame = Some(frame);
        self
    }

    /// Reference frames in submission order, with the single-frame model
    /// constraint applied.
    pub fn effective_frames(&self) -> Vec<&ImageData> {
        let mut frames: Vec<&ImageData> = Vec::new();
        if let Some(start) = &self.start_frame {
            frames.push(start);
        }
        if let Some(end) = &self.end_frame {
            frames.push(end);
        }
        if SINGLE_FRAME_VIDEO_MODELS.contains(&self.model.as_str()) && frames.len() > 1 {
            frames.truncate(1);
        }
        frames
    }
}

// =============================================================================
// Job tracking
// =============================================================================

/// Handle for a submitted video job.
///
/// Some relay backends answer a submission with a result URL instead of a
/// job id; such jobs are already done and never polled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJobHandle {
    /// Provider-assigned job id, when the job is asynchronous.
    pub job_id: Option<JobId>,
    /// Result URL, when the submission completed synchronously.
    pub result_url: Option<String>,
    /// Submission time (RFC 3339).
    pub submitted_at: String,
}

impl VideoJobHandle {
    pub fn new(job_id: Option<JobId>, result_url: Option<String>) -> Self {
        Self {
            job_id,
            result_url,
            submitted_at: Utc::now().to_rfc3339(),
        }
    }

    /// True when the submission already carries the result.
    pub fn is_done(&self) -> bool {
        self.result_url.is_some()
    }
}

/// Poll outcome for a video job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VideoPollStatus {
    /// Still rendering.
    Pending,
    /// Terminal success. A missing URL is a provider defect surfaced to
    /// the caller, not silently retried.
    Done { url: Option<String> },
    /// Terminal failure.
    Failed { reason: String },
}

/// A music (song) generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MusicRequest {
    pub title: String,
    /// Style tags (genre, mood, instruments, tempo).
    pub tags: String,
    pub lyrics: String,
}

impl MusicRequest {
    pub fn new(
        title: impl Into<String>,
        tags: impl Into<String>,
        lyrics: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            tags: tags.into(),
            lyrics: lyrics.into(),
        }
    }

    /// The prompt submitted to the music backend: lyrics when present,
    /// otherwise a tags-and-title description.
    pub fn submission_prompt(&self) -> String {
        if self.lyrics.is_empty() {
            format!("{}. {}", self.tags, self.title)
        } else {
            self.lyrics.clone()
        }
    }
}

/// Poll outcome for a music clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MusicPollStatus {
    /// Queued or rendering, no audio yet.
    Pending,
    /// Partial render; the URL is playable but the clip is still growing.
    Streaming { audio_url: Option<String> },
    /// Terminal success. `complete` without a URL has been observed while
    /// the file is still being finalized; callers keep polling for it.
    Complete { audio_url: Option<String> },
    /// Terminal failure.
    Failed { reason: String },
}

// =============================================================================
// Gateway trait
// =============================================================================

/// A generation backend.
///
/// All calls are one-shot network operations without retry; retry policy
/// is layered on top by callers.
#[async_trait]
pub trait GenerativeGateway: Send + Sync {
    /// Returns the gateway name.
    fn name(&self) -> &str;

    /// Generates text from a multimodal prompt.
    async fn generate_text(&self, request: &TextRequest) -> CoreResult<String>;

    /// Generates or edits an image.
    async fn generate_image(&self, request: &ImageRequest) -> CoreResult<ImageData>;

    /// Submits a video job.
    async fn submit_video(&self, request: &VideoRequest) -> CoreResult<VideoJobHandle>;

    /// Polls a submitted video job.
    async fn poll_video(&self, handle: &VideoJobHandle) -> CoreResult<VideoPollStatus>;

    /// Downloads generated media from a result URL.
    async fn fetch_media(&self, url: &str) -> CoreResult<Vec<u8>>;

    /// Submits a music job, returning the clip id to poll.
    async fn submit_music(&self, request: &MusicRequest) -> CoreResult<JobId>;

    /// Polls a submitted music clip.
    async fn poll_music(&self, clip_id: &str) -> CoreResult<MusicPollStatus>;
}

// =============================================================================
// Mock gateway
// =============================================================================

/// Scriptable in-memory gateway for tests and offline runs.
///
/// Each method pops from its own response queue; an empty queue yields a
/// benign default so unscripted flows still complete. Requests are logged
/// for assertion.
#[derive(Default)]
pub struct MockGateway {
    text_responses: Mutex<VecDeque<CoreResult<String>>>,
    image_responses: Mutex<VecDeque<CoreResult<ImageData>>>,
    video_submissions: Mutex<VecDeque<CoreResult<VideoJobHandle>>>,
    video_polls: Mutex<VecDeque<CoreResult<VideoPollStatus>>>,
    music_submissions: Mutex<VecDeque<CoreResult<JobId>>>,
    music_polls: Mutex<VecDeque<CoreResult<MusicPollStatus>>>,
    media: Mutex<VecDeque<CoreResult<Vec<u8>>>>,
    text_log: Mutex<Vec<TextRequest>>,
    image_log: Mutex<Vec<ImageRequest>>,
    video_log: Mutex<Vec<VideoRequest>>,
    music_log: Mutex<Vec<MusicRequest>>,
    fetched_urls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, response: CoreResult<String>) {
        self.text_responses.lock().unwrap().push_back(response);
    }

    pub fn push_image(&self, response: CoreResult<ImageData>) {
        self.image_responses.lock().unwrap().push_back(response);
    }

    pub fn push_video_submission(&self, response: CoreResult<VideoJobHandle>) {
        self.video_submissions.lock().unwrap().push_back(response);
    }

    pub fn push_video_poll(&self, response: CoreResult<VideoPollStatus>) {
        self.video_polls.lock().unwrap().push_back(response);
    }

    pub fn push_music_submission(&self, response: CoreResult<JobId>) {
        self.music_submissions.lock().unwrap().push_back(response);
    }

    pub fn push_music_poll(&self, response: CoreResult<MusicPollStatus>) {
        self.music_polls.lock().unwrap().push_back(response);
    }

    pub fn push_media(&self, response: CoreResult<Vec<u8>>) {
        self.media.lock().unwrap().push_back(response);
    }

    pub fn with_text(self, response: impl Into<String>) -> Self {
        self.push_text(Ok(response.into()));
        self
    }

    pub fn with_text_error(self, error: crate::core::CoreError) -> Self {
        self.push_text(Err(error));
        self
    }

    /// Logged text requests, oldest first.
    pub fn text_requests(&self) -> Vec<TextRequest> {
        self.text_log.lock().unwrap().clone()
    }

    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.image_log.lock().unwrap().clone()
    }

    pub fn video_requests(&self) -> Vec<VideoRequest> {
        self.video_log.lock().unwrap().clone()
    }

    pub fn music_requests(&self) -> Vec<MusicRequest> {
        self.music_log.lock().unwrap().clone()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched_urls.lock().unwrap().clone()
    }

    fn stub_image() -> ImageData {
        ImageData::new("image/png", vec![0u8; 16])
    }
}

#[async_trait]
impl GenerativeGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_text(&self, request: &TextRequest) -> CoreResult<String> {
        self.text_log.lock().unwrap().push(request.clone());
        match self.text_responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok("{}".to_string()),
        }
    }

    async fn generate_image(&self, request: &ImageRequest) -> CoreResult<ImageData> {
        self.image_log.lock().unwrap().push(request.clone());
        match self.image_responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(Self::stub_image()),
        }
    }

    async fn submit_video(&self, request: &VideoRequest) -> CoreResult<VideoJobHandle> {
        self.video_log.lock().unwrap().push(request.clone());
        match self.video_submissions.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(VideoJobHandle::new(Some("mock-job".to_string()), None)),
        }
    }

    async fn poll_video(&self, _handle: &VideoJobHandle) -> CoreResult<VideoPollStatus> {
        match self.video_polls.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(VideoPollStatus::Done {
                url: Some("mock://clip".to_string()),
            }),
        }
    }

    async fn fetch_media(&self, url: &str) -> CoreResult<Vec<u8>> {
        self.fetched_urls.lock().unwrap().push(url.to_string());
        match self.media.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(vec![0u8; 32]),
        }
    }

    async fn submit_music(&self, request: &MusicRequest) -> CoreResult<JobId> {
        self.music_log.lock().unwrap().push(request.clone());
        match self.music_submissions.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok("mock-clip".to_string()),
        }
    }

    async fn poll_music(&self, _clip_id: &str) -> CoreResult<MusicPollStatus> {
        match self.music_polls.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(MusicPollStatus::Complete {
                audio_url: Some("mock://audio".to_string()),
            }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CoreError;

    #[test]
    fn test_text_request_joined_text() {
        let request = TextRequest::from_parts(vec![
            ContentPart::Text("first".to_string()),
            ContentPart::Image(ImageData::new("image/png", vec![1])),
            ContentPart::Text("second".to_string()),
        ]);
        assert_eq!(request.joined_text(), "first\nsecond");
    }

    #[test]
    fn test_image_request_first_image() {
        let image = ImageData::new("image/jpeg", vec![1, 2, 3]);
        let request = ImageRequest::from_parts(
            vec![
                ContentPart::Text("prompt".to_string()),
                ContentPart::Image(image.clone()),
                ContentPart::Image(ImageData::new("image/png", vec![9])),
            ],
            AspectRatio::Square,
        );

        assert!(request.has_image_input());
        assert_eq!(request.first_image().map(|i| i.mime.as_str()), Some("image/jpeg"));
        assert_eq!(request.prompt_text(), "prompt");
    }

    #[test]
    fn test_video_request_defaults() {
        let request = VideoRequest::new("a shot");
        assert_eq!(request.model, DEFAULT_VIDEO_MODEL);
        assert_eq!(request.aspect, AspectRatio::Widescreen);
        assert!(request.effective_frames().is_empty());
    }

    #[test]
    fn test_video_request_empty_model_keeps_default() {
        let request = VideoRequest::new("a shot").with_model("");
        assert_eq!(request.model, DEFAULT_VIDEO_MODEL);

        let request = VideoRequest::new("a shot").with_model("veo3.1");
        assert_eq!(request.model, "veo3.1");
    }

    #[test]
    fn test_single_frame_model_drops_end_frame() {
        let start = ImageData::new("image/png", vec![1]);
        let end = ImageData::new("image/png", vec![2]);

        let request = VideoRequest::new("a shot")
            .with_model("veo3-pro-frames")
            .with_start_frame(start.clone())
            .with_end_frame(end.clone());
        assert_eq!(request.effective_frames().len(), 1);
        assert_eq!(request.effective_frames()[0].bytes, vec![1]);

        let request = VideoRequest::new("a shot")
            .with_start_frame(start)
            .with_end_frame(end);
        assert_eq!(request.effective_frames().len(), 2);
    }

    #[test]
    fn test_job_handle_done_detection() {
        let pending = VideoJobHandle::new(Some("job-1".to_string()), None);
        assert!(!pending.is_done());

        let done = VideoJobHandle::new(None, Some("https://cdn/clip.mp4".to_string()));
        assert!(done.is_done());
    }

    #[test]
    fn test_music_submission_prompt() {
        let with_lyrics = MusicRequest::new("Title", "Epic, Orchestral", "Verse 1...");
        assert_eq!(with_lyrics.submission_prompt(), "Verse 1...");

        let instrumental = MusicRequest::new("Night Drive", "Synthwave, Moody", "");
        assert_eq!(instrumental.submission_prompt(), "Synthwave, Moody. Night Drive");
    }

    #[tokio::test]
    async fn test_mock_gateway_scripted_responses() {
        let gateway = MockGateway::new();
        gateway.push_text(Ok("scripted".to_string()));
        gateway.push_text(Err(CoreError::GatewayRequestFailed(
            "Server Busy: 503".to_string(),
        )));

        let first = gateway.generate_text(&TextRequest::new("hello")).await;
        assert_eq!(first.ok().as_deref(), Some("scripted"));

        let second = gateway.generate_text(&TextRequest::new("again")).await;
        assert!(second.is_err());

        // Queue exhausted, default kicks in.
        let third = gateway.generate_text(&TextRequest::new("more")).await;
        assert_eq!(third.ok().as_deref(), Some("{}"));

        assert_eq!(gateway.text_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_gateway_logs_video_requests() {
        let gateway = MockGateway::new();
        let request = VideoRequest::new("chase scene").with_model("veo3.1");
        let handle = gateway.submit_video(&request).await.ok();
        assert!(handle.is_some());

        let logged = gateway.video_requests();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].prompt, "chase scene");
        assert_eq!(logged[0].model, "veo3.1");
    }

    #[test]
    fn test_poll_status_wire_form() {
        let status = VideoPollStatus::Done {
            url: Some("https://cdn/clip.mp4".to_string()),
        };
        let json = serde_json::to_string(&status).ok();
        assert_eq!(
            json.as_deref(),
            Some(r#"{"state":"done","url":"https://cdn/clip.mp4"}"#)
        );
    }
}
