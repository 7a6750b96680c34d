//! Relay Gateway
//!
//! HTTP implementation of [`GenerativeGateway`] against the multi-provider
//! relay service. Text and image generation use OpenAI-compatible REST
//! endpoints; video and music use async submit + poll job endpoints.
//!
//! Each modality authenticates with its own key so quota exhaustion on one
//! lane does not take down the others. Calls here are single-shot; retry
//! policy lives in [`crate::core::retry`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::envelope::{ResponseEnvelope, POLL_URL_FIELDS, SUBMIT_URL_FIELDS};
use super::provider::{
    ContentPart, GenerativeGateway, ImageRequest, MusicPollStatus, MusicRequest, TextRequest,
    VideoJobHandle, VideoPollStatus, VideoRequest,
};
use crate::core::{AspectRatio, CoreError, CoreResult, ImageData, JobId};

// =============================================================================
// Constants
// =============================================================================

/// Default base URL for the relay service.
pub const DEFAULT_BASE_URL: &str = "https://ai.t8star.cn";

/// Chat model behind `/v1/chat/completions`.
const TEXT_MODEL: &str = "gemini-3-pro-preview";

/// Image model behind `/v1/images/*`.
const IMAGE_MODEL: &str = "nano-banana-2-2k";

/// Music model behind `/suno/submit/music`.
const MUSIC_MODEL: &str = "chirp-v4";

/// Maximum allowed download size (500 MB) to prevent unbounded memory usage.
const MAX_DOWNLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Maximum error body excerpt carried into error messages.
const MAX_ERROR_BODY_CHARS: usize = 500;

// =============================================================================
// RelayGateway
// =============================================================================

/// Relay-backed generation gateway.
pub struct RelayGateway {
    /// HTTP client with configured timeout
    client: reqwest::Client,
    /// API key for text generation
    text_key: String,
    /// API key for image generation
    image_key: String,
    /// API key for video generation (also used to download results)
    video_key: String,
    /// Base URL for text/image/video endpoints
    base_url: String,
    /// Base URL for music endpoints
    music_base_url: String,
}

impl std::fmt::Debug for RelayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayGateway")
            .field("base_url", &self.base_url)
            .field("music_base_url", &self.music_base_url)
            .finish_non_exhaustive()
    }
}

impl RelayGateway {
    /// Creates a new gateway with one key shared across all modalities.
    pub fn new(api_key: impl Into<String>) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let key = api_key.into();
        Ok(Self {
            client,
            text_key: key.clone(),
            image_key: key.clone(),
            video_key: key,
            base_url: DEFAULT_BASE_URL.to_string(),
            music_base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the text lane key.
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Overrides the image lane key.
    pub fn with_image_key(mut self, key: impl Into<String>) -> Self {
        self.image_key = key.into();
        self
    }

    /// Overrides the video lane key.
    pub fn with_video_key(mut self, key: impl Into<String>) -> Self {
        self.video_key = key.into();
        self
    }

    /// Sets a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets a custom music base URL.
    pub fn with_music_base_url(mut self, url: impl Into<String>) -> Self {
        self.music_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn image_generations_url(&self) -> String {
        format!("{}/v1/images/generations", self.base_url)
    }

    fn image_edits_url(&self) -> String {
        format!("{}/v1/images/edits", self.base_url)
    }

    fn video_submit_url(&self) -> String {
        format!("{}/v2/videos/generations", self.base_url)
    }

    fn video_poll_url(&self, job_id: &str) -> String {
        format!("{}/v2/videos/generations/{}", self.base_url, job_id)
    }

    /// Query-parameter form of the poll URL, for backends that reject the
    /// path form with 404.
    fn video_poll_query_url(&self, job_id: &str) -> CoreResult<String> {
        let mut url = reqwest::Url::parse(&self.video_submit_url())
            .map_err(|e| CoreError::Internal(format!("Invalid base URL: {}", e)))?;
        url.query_pairs_mut().append_pair("id", job_id);
        Ok(url.to_string())
    }

    fn music_submit_url(&self) -> String {
        format!("{}/suno/submit/music", self.music_base_url)
    }

    fn music_poll_url(&self, clip_id: &str) -> String {
        format!("{}/suno/get/music?ids={}", self.music_base_url, clip_id)
    }

    /// Unauthenticated fallback poll endpoint some relay deployments expose.
    fn music_poll_fallback_url(&self, clip_id: &str) -> String {
        format!("{}/api/get?ids={}", self.music_base_url, clip_id)
    }

    fn bearer(key: &str) -> String {
        format!("Bearer {}", key)
    }

    /// Maps a non-success HTTP status to an error message the failure
    /// classifier and retry layer recognize. A body excerpt is appended so
    /// upstream quota signatures survive into the message.
    fn status_error(status: StatusCode, body: &str) -> CoreError {
        let code = status.as_u16();
        let label = match code {
            401 | 403 => format!("Proxy Auth Error: {}", code),
            429 | 500 | 503 => format!("Server Busy: {}", code),
            _ => format!("HTTP Error: {}", code),
        };

        let excerpt: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
        if excerpt.is_empty() {
            CoreError::GatewayRequestFailed(label)
        } else {
            CoreError::GatewayRequestFailed(format!("{}: {}", label, excerpt))
        }
    }

    /// Reads a response body, mapping non-success statuses to errors.
    async fn read_response(resp: reqwest::Response) -> CoreResult<ResponseEnvelope> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::status_error(status, &body));
        }

        Ok(ResponseEnvelope::from_body(&body))
    }

    /// Base64 image payload from an image endpoint response.
    fn image_payload(envelope: &ResponseEnvelope) -> Option<&str> {
        envelope.first_text(&["data.0.b64_json", "data.0.b64"])
    }

    fn decode_image(b64: &str) -> CoreResult<ImageData> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| {
                CoreError::GatewayRequestFailed(format!("Invalid image payload: {}", e))
            })?;
        Ok(ImageData::new("image/png", bytes))
    }

    fn image_generation_body(prompt: &str, size: &str) -> Value {
        json!({
            "model": IMAGE_MODEL,
            "prompt": prompt,
            "size": size,
            "response_format": "b64_json",
            "n": 1,
        })
    }

    async fn post_image_generation(&self, body: &Value) -> CoreResult<ResponseEnvelope> {
        let resp = self
            .client
            .post(self.image_generations_url())
            .header("Authorization", Self::bearer(&self.image_key))
            .json(body)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;
        Self::read_response(resp).await
    }

    async fn post_image_edit(&self, request: &ImageRequest) -> CoreResult<ResponseEnvelope> {
        // Only the first image part is sent; the edit endpoint takes one.
        let image = request
            .first_image()
            .ok_or_else(|| CoreError::ValidationError("Image edit without an image".to_string()))?;

        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name("image")
            .mime_str(&image.mime)
            .map_err(|e| {
                CoreError::ValidationError(format!("Invalid image MIME type '{}': {}", image.mime, e))
            })?;

        let prompt = request.prompt_text();
        let mut form = multipart::Form::new().part("image", part);
        if !prompt.is_empty() {
            form = form.text("prompt", prompt);
        }
        form = form
            .text("model", IMAGE_MODEL)
            .text("size", request.aspect.image_size().to_string())
            .text("response_format", "b64_json")
            .text("n", "1");

        let resp = self
            .client
            .post(self.image_edits_url())
            .header("Authorization", Self::bearer(&self.image_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;
        Self::read_response(resp).await
    }

    async fn poll_music_once(&self, clip_id: &str) -> CoreResult<ResponseEnvelope> {
        // Music rides the text credential; it has no dedicated lane.
        let resp = self
            .client
            .get(self.music_poll_url(clip_id))
            .header("Authorization", Self::bearer(&self.text_key))
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;

        if resp.status().is_success() {
            let body = resp
                .text()
                .await
                .map_err(|e| CoreError::Internal(format!("Failed to read response: {}", e)))?;
            return Ok(ResponseEnvelope::from_body(&body));
        }

        // The authenticated endpoint is not universally deployed; fall back
        // to the open one before giving up.
        let resp = self
            .client
            .get(self.music_poll_fallback_url(clip_id))
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;
        Self::read_response(resp).await
    }
}

#[async_trait]
impl GenerativeGateway for RelayGateway {
    fn name(&self) -> &str {
        "relay"
    }

    async fn generate_text(&self, request: &TextRequest) -> CoreResult<String> {
        let mut content: Vec<Value> = Vec::new();
        for part in &request.parts {
            match part {
                ContentPart::Text(text) => {
                    if !text.is_empty() {
                        content.push(json!({ "type": "text", "text": text }));
                    }
                }
                ContentPart::Image(image) => {
                    content.push(json!({
                        "type": "image_url",
                        "image_url": { "url": image.to_data_url() },
                    }));
                }
            }
        }
        if content.is_empty() {
            content.push(json!({ "type": "text", "text": "" }));
        }

        let mut body = json!({
            "model": TEXT_MODEL,
            "messages": [{ "role": "user", "content": content }],
            "stream": false,
        });
        if request.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }

        debug!("relay chat request: {} parts", request.parts.len());

        let resp = self
            .client
            .post(self.chat_url())
            .header("Authorization", Self::bearer(&self.text_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;
        let envelope = Self::read_response(resp).await?;

        Ok(envelope
            .text_at("choices.0.message.content")
            .unwrap_or_default()
            .to_string())
    }

    async fn generate_image(&self, request: &ImageRequest) -> CoreResult<ImageData> {
        let envelope = if request.has_image_input() {
            self.post_image_edit(request).await?
        } else {
            let prompt = request.prompt_text();
            let body = Self::image_generation_body(&prompt, request.aspect.image_size());
            let envelope = self.post_image_generation(&body).await?;

            if Self::image_payload(&envelope).is_some() {
                envelope
            } else {
                // Some sizes intermittently render empty; one retry at the
                // square size recovers most of them.
                debug!("empty image payload, retrying at square size");
                let body =
                    Self::image_generation_body(&prompt, AspectRatio::Square.image_size());
                self.post_image_generation(&body).await?
            }
        };

        let b64 = Self::image_payload(&envelope).ok_or_else(|| {
            CoreError::GatewayRequestFailed("Image generation returned no data".to_string())
        })?;
        Self::decode_image(b64)
    }

    async fn submit_video(&self, request: &VideoRequest) -> CoreResult<VideoJobHandle> {
        let mut payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "aspect_ratio": request.aspect.as_str(),
            "enhance_prompt": false,
        });

        let frames: Vec<String> = request
            .effective_frames()
            .iter()
            .map(|frame| frame.to_data_url())
            .collect();
        if !frames.is_empty() {
            payload["images"] = json!(frames);
        }

        let resp = self
            .client
            .post(self.video_submit_url())
            .header("Authorization", Self::bearer(&self.video_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;
        let envelope = Self::read_response(resp).await?;

        let job_id = envelope.job_id();
        let result_url = envelope.first_text(SUBMIT_URL_FIELDS).map(String::from);
        if job_id.is_none() && result_url.is_none() {
            return Err(CoreError::GatewayRequestFailed(
                "Video submission returned no job id".to_string(),
            ));
        }

        info!(
            "video job submitted: model={} job_id={}",
            request.model,
            job_id.as_deref().unwrap_or("<sync>"),
        );

        Ok(VideoJobHandle::new(job_id, result_url))
    }

    async fn poll_video(&self, handle: &VideoJobHandle) -> CoreResult<VideoPollStatus> {
        if let Some(url) = &handle.result_url {
            return Ok(VideoPollStatus::Done {
                url: Some(url.clone()),
            });
        }
        let job_id = handle.job_id.as_deref().ok_or_else(|| {
            CoreError::GatewayRequestFailed("Video job handle has no job id".to_string())
        })?;

        let resp = self
            .client
            .get(self.video_poll_url(job_id))
            .header("Authorization", Self::bearer(&self.video_key))
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;

        let envelope = if resp.status() == StatusCode::NOT_FOUND {
            let url = self.video_poll_query_url(job_id)?;
            let resp = self
                .client
                .get(url)
                .header("Authorization", Self::bearer(&self.video_key))
                .send()
                .await
                .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;
            Self::read_response(resp).await?
        } else {
            Self::read_response(resp).await?
        };

        debug!(
            "video poll {}: status={}",
            job_id,
            envelope.status().unwrap_or("<none>"),
        );

        match envelope.status() {
            Some("SUCCESS") => Ok(VideoPollStatus::Done {
                url: envelope.first_text(POLL_URL_FIELDS).map(String::from),
            }),
            Some("FAILURE") => Ok(VideoPollStatus::Failed {
                reason: envelope
                    .text_at("fail_reason")
                    .unwrap_or("Veo Generation Failed")
                    .to_string(),
            }),
            _ => Ok(VideoPollStatus::Pending),
        }
    }

    async fn fetch_media(&self, url: &str) -> CoreResult<Vec<u8>> {
        // Relay result URLs already carry a query string; the download key
        // is appended to it.
        let download_url = format!("{}&key={}", url, self.video_key);

        let mut resp = self
            .client
            .get(&download_url)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;

        if !resp.status().is_success() {
            return Err(CoreError::GatewayRequestFailed(
                "Failed to download video bytes".to_string(),
            ));
        }

        if let Some(content_len) = resp.content_length() {
            if content_len > MAX_DOWNLOAD_BYTES {
                return Err(CoreError::ValidationError(format!(
                    "Downloaded media is too large ({} bytes > {} bytes limit)",
                    content_len, MAX_DOWNLOAD_BYTES
                )));
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to read chunk: {}", e)))?
        {
            if (bytes.len() as u64).saturating_add(chunk.len() as u64) > MAX_DOWNLOAD_BYTES {
                return Err(CoreError::ValidationError(format!(
                    "Downloaded media exceeded max size limit ({} bytes)",
                    MAX_DOWNLOAD_BYTES
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        info!("downloaded generated media ({} bytes)", bytes.len());
        Ok(bytes)
    }

    async fn submit_music(&self, request: &MusicRequest) -> CoreResult<JobId> {
        let payload = json!({
            "prompt": request.submission_prompt(),
            "mv": MUSIC_MODEL,
            "title": request.title,
            "tags": request.tags,
        });

        let resp = self
            .client
            .post(self.music_submit_url())
            .header("Authorization", Self::bearer(&self.text_key))
            .header("accept", "*/*")
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("Network error: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::MusicFailed(format!(
                "Suno API Error: {}",
                status.canonical_reason().unwrap_or("request failed"),
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to read response: {}", e)))?;
        let clip = ResponseEnvelope::from_body(&body).first_element();

        let clip_id = clip
            .text_at("id")
            .map(String::from)
            .ok_or_else(|| CoreError::MusicFailed("No clips started".to_string()))?;

        info!("music clip submitted: id={}", clip_id);
        Ok(clip_id)
    }

    async fn poll_music(&self, clip_id: &str) -> CoreResult<MusicPollStatus> {
        let clip = self.poll_music_once(clip_id).await?.first_element();
        let audio_url = clip.text_at("audio_url").map(String::from);

        debug!(
            "music poll {}: status={}",
            clip_id,
            clip.status().unwrap_or("<none>"),
        );

        match clip.status() {
            Some("complete") => Ok(MusicPollStatus::Complete { audio_url }),
            Some("streaming") => Ok(MusicPollStatus::Streaming { audio_url }),
            Some("error") => Ok(MusicPollStatus::Failed {
                reason: "Generation Failed".to_string(),
            }),
            _ => Ok(MusicPollStatus::Pending),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> RelayGateway {
        RelayGateway::new("test-key").unwrap()
    }

    #[test]
    fn test_url_building() {
        let gw = gateway();
        assert_eq!(gw.chat_url(), "https://ai.t8star.cn/v1/chat/completions");
        assert_eq!(
            gw.image_generations_url(),
            "https://ai.t8star.cn/v1/images/generations"
        );
        assert_eq!(gw.image_edits_url(), "https://ai.t8star.cn/v1/images/edits");
        assert_eq!(
            gw.video_submit_url(),
            "https://ai.t8star.cn/v2/videos/generations"
        );
        assert_eq!(
            gw.video_poll_url("job-123"),
            "https://ai.t8star.cn/v2/videos/generations/job-123"
        );
        assert_eq!(
            gw.music_poll_url("clip-1"),
            "https://ai.t8star.cn/suno/get/music?ids=clip-1"
        );
        assert_eq!(
            gw.music_poll_fallback_url("clip-1"),
            "https://ai.t8star.cn/api/get?ids=clip-1"
        );
    }

    #[test]
    fn test_custom_base_url_trims_trailing_slash() {
        let gw = gateway().with_base_url("https://custom.relay/");
        assert_eq!(gw.chat_url(), "https://custom.relay/v1/chat/completions");

        let gw = gateway().with_music_base_url("https://music.relay//");
        assert_eq!(
            gw.music_submit_url(),
            "https://music.relay/suno/submit/music"
        );
    }

    #[test]
    fn test_poll_query_url_encodes_id() {
        let gw = gateway();
        let url = gw.video_poll_query_url("job with space").unwrap();
        assert_eq!(
            url,
            "https://ai.t8star.cn/v2/videos/generations?id=job+with+space"
        );
    }

    #[test]
    fn test_status_error_labels() {
        let err = RelayGateway::status_error(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.to_string(), "Gateway request failed: Proxy Auth Error: 401");

        let err = RelayGateway::status_error(StatusCode::FORBIDDEN, "");
        assert!(err.to_string().contains("Proxy Auth Error: 403"));

        for code in [429u16, 500, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = RelayGateway::status_error(status, "");
            assert!(
                err.to_string().contains(&format!("Server Busy: {}", code)),
                "wrong label for {}",
                code
            );
        }

        let err = RelayGateway::status_error(StatusCode::BAD_GATEWAY, "");
        assert!(err.to_string().contains("HTTP Error: 502"));
    }

    #[test]
    fn test_status_error_carries_body_excerpt() {
        let err = RelayGateway::status_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"quota exceeded per_day"}}"#,
        );
        let message = err.to_string();
        assert!(message.contains("Server Busy: 429"));
        assert!(message.contains("per_day"));
    }

    #[test]
    fn test_status_error_truncates_long_bodies() {
        let long_body = "x".repeat(2000);
        let err = RelayGateway::status_error(StatusCode::INTERNAL_SERVER_ERROR, &long_body);
        assert!(err.to_string().len() < 600);
    }

    #[test]
    fn test_image_payload_extraction() {
        let envelope =
            ResponseEnvelope::from_body(r#"{"data":[{"b64_json":"aGVsbG8="}]}"#);
        assert_eq!(RelayGateway::image_payload(&envelope), Some("aGVsbG8="));

        // Alternate field name used by some backends.
        let envelope = ResponseEnvelope::from_body(r#"{"data":[{"b64":"d29ybGQ="}]}"#);
        assert_eq!(RelayGateway::image_payload(&envelope), Some("d29ybGQ="));

        let envelope = ResponseEnvelope::from_body(r#"{"data":[{"b64_json":""}]}"#);
        assert_eq!(RelayGateway::image_payload(&envelope), None);
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(RelayGateway::decode_image("aGVsbG8=").is_ok());
        assert!(RelayGateway::decode_image("!!!not base64!!!").is_err());
    }

    #[test]
    fn test_image_generation_body_shape() {
        let body = RelayGateway::image_generation_body("a castle", "1024x576");
        assert_eq!(body["model"], IMAGE_MODEL);
        assert_eq!(body["prompt"], "a castle");
        assert_eq!(body["size"], "1024x576");
        assert_eq!(body["response_format"], "b64_json");
        assert_eq!(body["n"], 1);
    }

    #[test]
    fn test_debug_hides_keys() {
        let gw = RelayGateway::new("super-secret").unwrap();
        let debug = format!("{:?}", gw);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("base_url"));
    }
}
