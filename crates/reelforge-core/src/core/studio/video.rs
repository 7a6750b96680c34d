//! Video Clip Production
//!
//! Turns a rendered shot image into a moving clip: submit to the video
//! backend, poll the job to completion under a hard tick limit, then fetch
//! the clip bytes through the relay before the result URL expires. Polling
//! is the one place a cancel request is honored between ticks; an already
//! submitted job keeps rendering on the provider side, it just stops being
//! watched.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::core::gateway::{VideoJobHandle, VideoPollStatus, VideoRequest};
use crate::core::project::{Project, VideoClip, VideoStatus};
use crate::core::{AspectRatio, CoreError, CoreResult};

use super::StudioEngine;

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancel flag for long poll loops.
///
/// Cancelling never aborts an in-flight request; the loop observes the flag
/// between ticks and returns [`CoreError::Cancelled`]. Share across tasks
/// with an `Arc`.
#[derive(Debug)]
pub struct CancelToken {
    flag: watch::Sender<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Clip generation
// =============================================================================

impl StudioEngine {
    /// Produces the video clip for one shot from its rendered image.
    ///
    /// The start frame is required; the end frame rides along when the shot
    /// has one and the model accepts it. Vertical projects submit vertical
    /// video, everything else widescreen. The shot's status tracks the
    /// job: `Generating` while running, `Done` with the clip stored on
    /// success, `Error` on failure, and back to `Idle` when cancelled.
    pub async fn generate_shot_video(
        &self,
        project: &mut Project,
        scene_id: &str,
        shot_id: &str,
        cancel: &CancelToken,
    ) -> CoreResult<()> {
        let request = {
            let scene = project
                .scene(scene_id)
                .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
            let shot = scene
                .shot(shot_id)
                .ok_or_else(|| CoreError::ShotNotFound(shot_id.to_string()))?;
            let start = shot.image.clone().ok_or(CoreError::MissingStartFrame)?;

            let aspect = if project.settings.aspect_ratio == AspectRatio::Vertical {
                AspectRatio::Vertical
            } else {
                AspectRatio::Widescreen
            };
            let mut request = VideoRequest::new(shot.visual_description.clone())
                .with_model(self.video_model.clone())
                .with_aspect(aspect)
                .with_start_frame(start);
            if let Some(end) = shot.last_frame.clone() {
                request = request.with_end_frame(end);
            }
            request
        };

        set_video_status(project, scene_id, shot_id, VideoStatus::Generating);

        match self.run_video_job(&request, cancel).await {
            Ok(clip) => {
                info!("shot {} clip ready ({} bytes)", shot_id, clip.bytes.len());
                if let Some(shot) = project
                    .scene_mut(scene_id)
                    .and_then(|scene| scene.shot_mut(shot_id))
                {
                    shot.video = Some(clip);
                    shot.video_status = VideoStatus::Done;
                }
                Ok(())
            }
            Err(CoreError::Cancelled) => {
                set_video_status(project, scene_id, shot_id, VideoStatus::Idle);
                Err(CoreError::Cancelled)
            }
            Err(err) => {
                set_video_status(project, scene_id, shot_id, VideoStatus::Error);
                Err(err)
            }
        }
    }

    async fn run_video_job(
        &self,
        request: &VideoRequest,
        cancel: &CancelToken,
    ) -> CoreResult<VideoClip> {
        let handle = self
            .retry
            .execute(|| self.gateway.submit_video(request))
            .await?;

        let url = if let Some(url) = handle.result_url.clone() {
            url
        } else {
            self.poll_video_until_done(&handle, cancel).await?
        };

        let bytes = self.gateway.fetch_media(&url).await?;
        Ok(VideoClip::new(bytes, url))
    }

    /// Polls the job once per interval until it resolves, the tick limit
    /// runs out, or the token is cancelled. Poll transport errors are
    /// terminal here; the relay answers a live job cheaply, so a failing
    /// poll means the job itself is unreachable.
    async fn poll_video_until_done(
        &self,
        handle: &VideoJobHandle,
        cancel: &CancelToken,
    ) -> CoreResult<String> {
        let interval = Duration::from_millis(self.generation.video_poll_interval_ms);
        for _ in 0..self.generation.video_poll_limit {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            sleep(interval).await;
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            match self.gateway.poll_video(handle).await? {
                VideoPollStatus::Pending => {}
                VideoPollStatus::Done { url: Some(url) } => return Ok(url),
                VideoPollStatus::Done { url: None } => {
                    return Err(CoreError::GatewayRequestFailed(
                        "No video returned".to_string(),
                    ))
                }
                VideoPollStatus::Failed { reason } => {
                    return Err(CoreError::GatewayRequestFailed(format!(
                        "Veo Generation Error: {}",
                        reason
                    )))
                }
            }
        }
        Err(CoreError::VideoTimeout)
    }
}

fn set_video_status(project: &mut Project, scene_id: &str, shot_id: &str, status: VideoStatus) {
    if let Some(shot) = project
        .scene_mut(scene_id)
        .and_then(|scene| scene.shot_mut(shot_id))
    {
        shot.video_status = status;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::gateway::MockGateway;
    use crate::core::project::{ProjectSettings, Scene, SceneMetadata, Shot};
    use crate::core::retry::RetryPolicy;
    use crate::core::settings::GenerationSettings;
    use crate::core::ImageData;

    fn image(byte: u8) -> ImageData {
        ImageData::new("image/png", vec![byte; 4])
    }

    fn engine_with_polling(
        gateway: Arc<MockGateway>,
        interval_ms: u64,
        limit: u32,
    ) -> StudioEngine {
        let generation = GenerationSettings {
            video_poll_interval_ms: interval_ms,
            video_poll_limit: limit,
            ..GenerationSettings::default()
        };
        StudioEngine::new(gateway)
            .with_retry_policy(RetryPolicy::default().with_initial_delay_ms(1))
            .with_generation(generation)
    }

    /// Project with one scene and one rendered shot; returns ids alongside.
    fn project_with_shot(aspect: AspectRatio) -> (Project, String, String) {
        let mut project = Project::new(ProjectSettings {
            aspect_ratio: aspect,
            ..ProjectSettings::default()
        });
        let mut shot = Shot::new(0, "she sprints across the catwalk");
        shot.image = Some(image(1));
        shot.last_frame = Some(image(2));
        let scene = Scene::story(1)
            .with_metadata(SceneMetadata::default())
            .with_shots(vec![shot]);
        let scene_id = scene.id.clone();
        let shot_id = scene.shots[0].id.clone();
        project.scenes.push(scene);
        (project, scene_id, shot_id)
    }

    #[test]
    fn test_cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(!CancelToken::default().is_cancelled());
    }

    #[tokio::test]
    async fn test_video_requires_start_image() {
        let gateway = Arc::new(MockGateway::new());
        let engine = engine_with_polling(gateway.clone(), 1, 5);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        project.scenes[0].shots[0].image = None;
        let cancel = CancelToken::new();

        let result = engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await;

        assert!(matches!(result, Err(CoreError::MissingStartFrame)));
        assert!(gateway.video_requests().is_empty());
        assert_eq!(project.scenes[0].shots[0].video_status, VideoStatus::Idle);
    }

    #[tokio::test]
    async fn test_video_generates_clip_end_to_end() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_video_submission(Ok(VideoJobHandle::new(Some("job-77".to_string()), None)));
        gateway.push_video_poll(Ok(VideoPollStatus::Pending));
        gateway.push_video_poll(Ok(VideoPollStatus::Done {
            url: Some("relay://clip-77".to_string()),
        }));
        gateway.push_media(Ok(vec![9u8; 8]));
        let engine = engine_with_polling(gateway.clone(), 1, 10);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        let cancel = CancelToken::new();

        engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await
            .unwrap();

        let requests = gateway.video_requests();
        assert_eq!(requests.len(), 1);
        // Square projects submit widescreen; only vertical stays vertical.
        assert_eq!(requests[0].aspect, AspectRatio::Widescreen);
        assert_eq!(requests[0].prompt, "she sprints across the catwalk");
        assert!(requests[0].start_frame.is_some());
        assert!(requests[0].end_frame.is_some());
        assert_eq!(gateway.fetched_urls(), vec!["relay://clip-77".to_string()]);

        let shot = &project.scenes[0].shots[0];
        assert_eq!(shot.video_status, VideoStatus::Done);
        let clip = shot.video.as_ref().unwrap();
        assert_eq!(clip.bytes, vec![9u8; 8]);
        assert_eq!(clip.source_url, "relay://clip-77");
        assert_eq!(clip.mime, "video/mp4");
    }

    #[tokio::test]
    async fn test_vertical_project_submits_vertical_video() {
        let gateway = Arc::new(MockGateway::new());
        let engine = engine_with_polling(gateway.clone(), 1, 10);
        let (mut project, scene_id, shot_id) =
            project_with_shot(AspectRatio::Vertical);
        let cancel = CancelToken::new();

        engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await
            .unwrap();

        assert_eq!(
            gateway.video_requests()[0].aspect,
            AspectRatio::Vertical
        );
    }

    #[tokio::test]
    async fn test_sync_submission_skips_polling() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_video_submission(Ok(VideoJobHandle::new(
            None,
            Some("relay://instant".to_string()),
        )));
        // A queued poll failure proves the loop never ran.
        gateway.push_video_poll(Err(CoreError::GatewayRequestFailed(
            "polled a finished job".to_string(),
        )));
        let engine = engine_with_polling(gateway.clone(), 1, 10);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        let cancel = CancelToken::new();

        engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await
            .unwrap();

        assert_eq!(gateway.fetched_urls(), vec!["relay://instant".to_string()]);
        assert_eq!(project.scenes[0].shots[0].video_status, VideoStatus::Done);
    }

    #[tokio::test]
    async fn test_failed_poll_surfaces_reason() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_video_submission(Ok(VideoJobHandle::new(Some("job-1".to_string()), None)));
        gateway.push_video_poll(Ok(VideoPollStatus::Failed {
            reason: "quota exceeded".to_string(),
        }));
        let engine = engine_with_polling(gateway.clone(), 1, 10);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        let cancel = CancelToken::new();

        let result = engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await;

        match result {
            Err(CoreError::GatewayRequestFailed(message)) => {
                assert_eq!(message, "Veo Generation Error: quota exceeded");
            }
            other => panic!("expected gateway failure, got {:?}", other),
        }
        assert_eq!(project.scenes[0].shots[0].video_status, VideoStatus::Error);
        assert!(gateway.fetched_urls().is_empty());
    }

    #[tokio::test]
    async fn test_done_without_url_is_an_error() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_video_submission(Ok(VideoJobHandle::new(Some("job-2".to_string()), None)));
        gateway.push_video_poll(Ok(VideoPollStatus::Done { url: None }));
        let engine = engine_with_polling(gateway.clone(), 1, 10);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        let cancel = CancelToken::new();

        let result = engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await;

        match result {
            Err(CoreError::GatewayRequestFailed(message)) => {
                assert_eq!(message, "No video returned");
            }
            other => panic!("expected gateway failure, got {:?}", other),
        }
        assert_eq!(project.scenes[0].shots[0].video_status, VideoStatus::Error);
    }

    #[tokio::test]
    async fn test_video_times_out_at_poll_limit() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_video_submission(Ok(VideoJobHandle::new(Some("job-3".to_string()), None)));
        // Exactly limit pending answers; one poll past the limit would hit
        // the mock's default Done and wrongly succeed.
        for _ in 0..4 {
            gateway.push_video_poll(Ok(VideoPollStatus::Pending));
        }
        let engine = engine_with_polling(gateway.clone(), 1, 4);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        let cancel = CancelToken::new();

        let result = engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await;

        assert!(matches!(result, Err(CoreError::VideoTimeout)));
        assert_eq!(project.scenes[0].shots[0].video_status, VideoStatus::Error);
        assert!(gateway.fetched_urls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_poll() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_video_submission(Ok(VideoJobHandle::new(Some("job-4".to_string()), None)));
        gateway.push_video_poll(Err(CoreError::GatewayRequestFailed(
            "polled a cancelled job".to_string(),
        )));
        let engine = engine_with_polling(gateway.clone(), 1, 10);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await;

        assert!(matches!(result, Err(CoreError::Cancelled)));
        // The submission went out, but the job is no longer watched and the
        // shot returns to an idle state.
        assert_eq!(gateway.video_requests().len(), 1);
        assert!(gateway.fetched_urls().is_empty());
        assert_eq!(project.scenes[0].shots[0].video_status, VideoStatus::Idle);
    }

    #[tokio::test]
    async fn test_cancel_mid_poll_loop() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_video_submission(Ok(VideoJobHandle::new(Some("job-5".to_string()), None)));
        for _ in 0..50 {
            gateway.push_video_poll(Ok(VideoPollStatus::Pending));
        }
        let engine = engine_with_polling(gateway.clone(), 20, 50);
        let (mut project, scene_id, shot_id) = project_with_shot(AspectRatio::Square);
        let cancel = Arc::new(CancelToken::new());

        let canceller = Arc::clone(&cancel);
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = engine
            .generate_shot_video(&mut project, &scene_id, &shot_id, &cancel)
            .await;

        assert!(matches!(result, Err(CoreError::Cancelled)));
        assert_eq!(project.scenes[0].shots[0].video_status, VideoStatus::Idle);
        assert!(gateway.fetched_urls().is_empty());
    }
}
