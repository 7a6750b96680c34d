//! Soundtrack Production
//!
//! Writes the song concept and runs the music backend's clip job to
//! completion. Music jobs stream: a partially rendered clip already carries
//! a playable URL, so the track unlocks as soon as any URL arrives while
//! polling continues until the render is final. Poll transport errors are
//! tolerated; the job keeps rendering server-side and the next tick usually
//! answers.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::core::gateway::{MusicPollStatus, MusicRequest, TextRequest};
use crate::core::project::{AudioTrack, Project, ProjectSettings};
use crate::core::script::{extract_json_object, music_concept_prompt};
use crate::core::{CoreError, CoreResult};

use super::StudioEngine;

/// A song concept reply.
#[derive(Debug, Clone, Default, Deserialize)]
struct MusicConcept {
    #[serde(default)]
    title: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    lyrics: String,
}

impl StudioEngine {
    /// Writes a song concept (title, style tags, lyrics) for the project.
    /// Lyrics come back in the requested language.
    pub async fn generate_music_concept(
        &self,
        settings: &ProjectSettings,
        lyric_language: &str,
    ) -> CoreResult<MusicRequest> {
        let request =
            TextRequest::new(music_concept_prompt(settings, lyric_language)).with_json_output(true);
        let reply = self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await?;
        let concept: MusicConcept = extract_json_object(&reply)?;
        Ok(MusicRequest::new(concept.title, concept.tags, concept.lyrics))
    }

    /// Submits the song and polls the clip job until the render is final.
    ///
    /// The track appears on the project immediately in a loading state. A
    /// streaming URL unlocks it early; the final URL replaces it when the
    /// render completes. A failed submission clears the track entirely,
    /// while a failed render keeps it with the error recorded.
    pub async fn generate_music(
        &self,
        project: &mut Project,
        request: &MusicRequest,
    ) -> CoreResult<()> {
        project.audio = Some(AudioTrack {
            title: request.title.clone(),
            style_tags: request.tags.clone(),
            lyrics: request.lyrics.clone(),
            prompt: request.submission_prompt(),
            url: None,
            loading: true,
            error: None,
        });

        let clip_id = match self
            .retry
            .execute(|| self.gateway.submit_music(request))
            .await
        {
            Ok(clip_id) => clip_id,
            Err(err) => {
                project.audio = None;
                return Err(err);
            }
        };
        info!("music clip {} submitted", clip_id);

        let interval = Duration::from_millis(self.generation.music_poll_interval_ms);
        for _ in 0..self.generation.music_poll_limit {
            sleep(interval).await;

            match self.gateway.poll_music(&clip_id).await {
                Ok(MusicPollStatus::Pending) => {}
                Ok(MusicPollStatus::Streaming { audio_url }) => {
                    // Playable already, but still growing.
                    if let (Some(url), Some(track)) = (audio_url, project.audio.as_mut()) {
                        track.url = Some(url);
                        track.loading = false;
                    }
                }
                Ok(MusicPollStatus::Complete { audio_url: None }) => {}
                Ok(MusicPollStatus::Complete {
                    audio_url: Some(url),
                }) => {
                    if let Some(track) = project.audio.as_mut() {
                        track.url = Some(url);
                        track.loading = false;
                    }
                    info!("music clip {} complete", clip_id);
                    return Ok(());
                }
                Ok(MusicPollStatus::Failed { reason }) => {
                    if let Some(track) = project.audio.as_mut() {
                        track.loading = false;
                        track.error = Some(reason.clone());
                    }
                    return Err(CoreError::MusicFailed(reason));
                }
                Err(err) => {
                    warn!("music poll failed, keeping the job watched: {}", err);
                }
            }
        }

        let reason = "clip did not finish within the poll window".to_string();
        if let Some(track) = project.audio.as_mut() {
            track.loading = false;
            track.error = Some(reason.clone());
        }
        Err(CoreError::MusicFailed(reason))
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
    use crate::core::retry::RetryPolicy;
    use crate::core::settings::GenerationSettings;

    fn engine_with_polling(gateway: Arc<MockGateway>, limit: u32) -> StudioEngine {
        let generation = GenerationSettings {
            music_poll_interval_ms: 1,
            music_poll_limit: limit,
            ..GenerationSettings::default()
        };
        StudioEngine::new(gateway)
            .with_retry_policy(RetryPolicy::default().with_initial_delay_ms(1))
            .with_generation(generation)
    }

    fn song_request() -> MusicRequest {
        MusicRequest::new("Shadow Signal", "Cinematic, Dark Jazz, Slow", "Verse 1...")
    }

    #[tokio::test]
    async fn test_music_concept_from_reply() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_text(Ok(r#"{
            "title": "Shadow Signal",
            "tags": "Cinematic, Dark Jazz, Female Vocals",
            "lyrics": "Verse 1: static on the line..."
        }"#
        .to_string()));
        let engine = engine_with_polling(gateway.clone(), 5);
        let settings = ProjectSettings::default();

        let concept = engine
            .generate_music_concept(&settings, "zh")
            .await
            .unwrap();

        assert_eq!(concept.title, "Shadow Signal");
        assert_eq!(concept.tags, "Cinematic, Dark Jazz, Female Vocals");
        assert!(concept.lyrics.starts_with("Verse 1"));

        let requests = gateway.text_requests();
        assert!(requests[0].json_output);
        assert!(requests[0].joined_text().contains("Songwriter"));
        assert!(requests[0].joined_text().contains("中文 (Chinese)"));
    }

    #[tokio::test]
    async fn test_music_streams_then_completes() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_music_submission(Ok("clip-9".to_string()));
        gateway.push_music_poll(Ok(MusicPollStatus::Pending));
        gateway.push_music_poll(Ok(MusicPollStatus::Streaming {
            audio_url: Some("relay://early".to_string()),
        }));
        gateway.push_music_poll(Ok(MusicPollStatus::Complete {
            audio_url: Some("relay://final".to_string()),
        }));
        let engine = engine_with_polling(gateway.clone(), 10);
        let mut project = Project::new(ProjectSettings::default());

        engine
            .generate_music(&mut project, &song_request())
            .await
            .unwrap();

        let track = project.audio.as_ref().unwrap();
        assert_eq!(track.title, "Shadow Signal");
        assert_eq!(track.url.as_deref(), Some("relay://final"));
        assert!(!track.loading);
        assert!(track.error.is_none());
        // Lyrics lead the submission when present.
        assert_eq!(track.prompt, "Verse 1...");
        assert_eq!(gateway.music_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_music_failure_keeps_track_with_error() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_music_submission(Ok("clip-1".to_string()));
        gateway.push_music_poll(Ok(MusicPollStatus::Failed {
            reason: "content flagged".to_string(),
        }));
        let engine = engine_with_polling(gateway.clone(), 10);
        let mut project = Project::new(ProjectSettings::default());

        let result = engine.generate_music(&mut project, &song_request()).await;

        match result {
            Err(CoreError::MusicFailed(reason)) => assert_eq!(reason, "content flagged"),
            other => panic!("expected music failure, got {:?}", other),
        }
        let track = project.audio.as_ref().unwrap();
        assert_eq!(track.error.as_deref(), Some("content flagged"));
        assert!(!track.loading);
        assert!(track.url.is_none());
    }

    #[tokio::test]
    async fn test_music_submit_failure_clears_track() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_music_submission(Err(CoreError::GatewayRequestFailed(
            "Proxy Auth Error: 401".to_string(),
        )));
        let engine = engine_with_polling(gateway.clone(), 10);
        let mut project = Project::new(ProjectSettings::default());

        let result = engine.generate_music(&mut project, &song_request()).await;

        assert!(result.is_err());
        assert!(project.audio.is_none());
        // An auth failure is not retried.
        assert_eq!(gateway.music_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_music_poll_errors_are_tolerated() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_music_submission(Ok("clip-2".to_string()));
        gateway.push_music_poll(Err(CoreError::GatewayRequestFailed(
            "relay hiccup".to_string(),
        )));
        gateway.push_music_poll(Ok(MusicPollStatus::Complete {
            audio_url: Some("relay://song".to_string()),
        }));
        let engine = engine_with_polling(gateway.clone(), 10);
        let mut project = Project::new(ProjectSettings::default());

        engine
            .generate_music(&mut project, &song_request())
            .await
            .unwrap();

        assert_eq!(
            project.audio.as_ref().unwrap().url.as_deref(),
            Some("relay://song")
        );
    }

    #[tokio::test]
    async fn test_music_complete_without_url_keeps_polling() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_music_submission(Ok("clip-3".to_string()));
        gateway.push_music_poll(Ok(MusicPollStatus::Complete { audio_url: None }));
        gateway.push_music_poll(Ok(MusicPollStatus::Complete {
            audio_url: Some("relay://late".to_string()),
        }));
        let engine = engine_with_polling(gateway.clone(), 10);
        let mut project = Project::new(ProjectSettings::default());

        engine
            .generate_music(&mut project, &song_request())
            .await
            .unwrap();

        assert_eq!(
            project.audio.as_ref().unwrap().url.as_deref(),
            Some("relay://late")
        );
    }

    #[tokio::test]
    async fn test_music_times_out_at_poll_limit() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_music_submission(Ok("clip-4".to_string()));
        // Exactly limit pending answers; a poll past the limit would hit
        // the mock's default Complete and wrongly succeed.
        for _ in 0..3 {
            gateway.push_music_poll(Ok(MusicPollStatus::Pending));
        }
        let engine = engine_with_polling(gateway.clone(), 3);
        let mut project = Project::new(ProjectSettings::default());

        let result = engine.generate_music(&mut project, &song_request()).await;

        match result {
            Err(CoreError::MusicFailed(reason)) => assert!(reason.contains("poll window")),
            other => panic!("expected music failure, got {:?}", other),
        }
        let track = project.audio.as_ref().unwrap();
        assert!(!track.loading);
        assert!(track.error.is_some());
    }

    #[tokio::test]
    async fn test_streaming_url_unlocks_track_early() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_music_submission(Ok("clip-5".to_string()));
        gateway.push_music_poll(Ok(MusicPollStatus::Streaming {
            audio_url: Some("relay://early".to_string()),
        }));
        // The render never finalizes inside the window; the early URL and
        // the timeout error coexist on the track.
        gateway.push_music_poll(Ok(MusicPollStatus::Pending));
        let engine = engine_with_polling(gateway.clone(), 2);
        let mut project = Project::new(ProjectSettings::default());

        let result = engine.generate_music(&mut project, &song_request()).await;

        assert!(result.is_err());
        let track = project.audio.as_ref().unwrap();
        assert_eq!(track.url.as_deref(), Some("relay://early"));
        assert!(!track.loading);
    }
}
