//! Studio Orchestration
//!
//! The production engine behind every storyboard operation: style analysis,
//! script planning, anchor and shot image rendering, structural scene edits,
//! video clips, and the soundtrack. The engine owns a gateway handle, a
//! retry policy, and generation pacing; all scene-graph writes go through
//! id-addressed lookups so a batch merges against the latest project state.

pub mod music;
pub mod video;

pub use video::CancelToken;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::core::classify::FailureKind;
use crate::core::continuity::{ContinuityState, STYLE_ANALYSIS_PROMPT};
use crate::core::gateway::{ContentPart, GenerativeGateway, TextRequest, DEFAULT_VIDEO_MODEL};
use crate::core::project::{AssetRef, Project, ProjectSettings, Scene, SceneMetadata, Shot};
use crate::core::retry::RetryPolicy;
use crate::core::script::{
    anchor_prompts, bridge_scene_prompt, bridge_shot_prompt, end_frame_plan_prompt,
    extract_json_object, inspire_options_prompt, inspire_premise_prompt, last_frame_prompt,
    plan_prompt, recommend_config_prompt, rewrite_scene_prompt, shot_image_prompt, InspireKind,
    PlanContext, PlannedShot, ScriptPlan, ShotImageRequest,
};
use crate::core::settings::{GenerationSettings, StudioSettings};
use crate::core::{AspectRatio, CoreError, CoreResult, SceneId, ShotId};

// =============================================================================
// Engine
// =============================================================================

/// Which anchor sheet an explicit regeneration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    Costume,
    Environment,
}

/// The production engine.
///
/// Holds the gateway, the retry policy applied to every one-shot generation
/// call, and the pacing knobs for batched rendering and job polling. The
/// engine itself is stateless between calls; all state lives in [`Project`].
pub struct StudioEngine {
    gateway: Arc<dyn GenerativeGateway>,
    retry: RetryPolicy,
    generation: GenerationSettings,
    video_model: String,
}

impl StudioEngine {
    pub fn new(gateway: Arc<dyn GenerativeGateway>) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::default(),
            generation: GenerationSettings::default(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
        }
    }

    /// Engine configured from persisted studio settings.
    pub fn from_settings(gateway: Arc<dyn GenerativeGateway>, settings: &StudioSettings) -> Self {
        Self {
            gateway,
            retry: settings.retry.to_policy(),
            generation: settings.generation.clone(),
            video_model: settings.gateway.video_model.clone(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_video_model(mut self, model: impl Into<String>) -> Self {
        self.video_model = model.into();
        self
    }

    pub fn gateway(&self) -> &dyn GenerativeGateway {
        self.gateway.as_ref()
    }
}

// =============================================================================
// Style analysis and script planning
// =============================================================================

impl StudioEngine {
    /// Detects the visual style category and keywords from the lead hero
    /// reference and stores the result on the project.
    ///
    /// This never fails: without a hero the current state is kept untouched,
    /// and a failed or unparseable analysis falls back to assumed
    /// live-action so generation can proceed.
    pub async fn analyze_style(&self, project: &mut Project) -> ContinuityState {
        let Some(hero) = project.assets.first_hero() else {
            return project.continuity.clone();
        };

        let request = TextRequest::from_parts(vec![
            ContentPart::Image(hero.image.clone()),
            ContentPart::Text(STYLE_ANALYSIS_PROMPT.to_string()),
        ])
        .with_json_output(true);

        let state = match self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await
        {
            Ok(reply) => ContinuityState::from_analysis_json(&reply),
            Err(err) => {
                warn!("style analysis failed, assuming live-action: {}", err);
                ContinuityState::assumed_real()
            }
        };

        info!(
            category = state.category.as_str(),
            "hero style analyzed"
        );
        project.continuity = state.clone();
        state
    }

    /// Plans the full script and replaces the project's scene list with a
    /// poster cover, the planned story scenes, and an end-title back cover.
    ///
    /// Style analysis runs first so the plan is written under the current
    /// visual lock. An empty plan is an error; the existing scene list is
    /// kept in that case.
    pub async fn plan_script(&self, project: &mut Project) -> CoreResult<()> {
        if !project.assets.has_heroes() {
            return Err(CoreError::NoHeroes);
        }

        self.analyze_style(project).await;

        let context = PlanContext {
            settings: &project.settings,
            assets: &project.assets,
            continuity: &project.continuity,
        };
        let request = TextRequest::new(plan_prompt(&context)).with_json_output(true);
        let reply = self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await?;

        let plan: ScriptPlan = extract_json_object(&reply)?;
        if plan.is_empty() {
            return Err(CoreError::ScriptEmpty);
        }

        project.masterpiece_ref = plan.masterpiece_ref();
        project.scenes = plan.into_scenes(&project.settings, project.assets.has_heroes());
        info!(scenes = project.scenes.len(), "script planned");
        Ok(())
    }
}

// =============================================================================
// Anchor and shot rendering
// =============================================================================

impl StudioEngine {
    /// Renders the scene's missing anchor sheets before any shot is drawn.
    ///
    /// Costume first, then environment, sequentially. Anchors already
    /// present are kept; a failed anchor is logged and skipped so the shot
    /// pass still runs, just without that reference.
    pub async fn generate_scene_anchors(
        &self,
        project: &mut Project,
        scene_id: &str,
    ) -> CoreResult<()> {
        let scene = project
            .scene(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let Some(metadata) = scene.metadata.clone() else {
            return Ok(());
        };

        let prompts = anchor_prompts(
            &metadata,
            &scene.shots,
            &project.assets,
            &project.continuity,
            &project.settings,
        );

        let mut costume = None;
        if metadata.anchor_costume_image.is_none() {
            if let Some(request) = prompts.costume {
                match self
                    .retry
                    .execute(|| self.gateway.generate_image(&request))
                    .await
                {
                    Ok(image) => costume = Some(image),
                    Err(err) => warn!("costume anchor generation failed: {}", err),
                }
            }
        }

        let mut environment = None;
        if metadata.anchor_environment_image.is_none() {
            if let Some(request) = prompts.environment {
                match self
                    .retry
                    .execute(|| self.gateway.generate_image(&request))
                    .await
                {
                    Ok(image) => environment = Some(image),
                    Err(err) => warn!("environment anchor generation failed: {}", err),
                }
            }
        }

        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        if let Some(metadata) = scene.metadata.as_mut() {
            if costume.is_some() {
                metadata.anchor_costume_image = costume;
            }
            if environment.is_some() {
                metadata.anchor_environment_image = environment;
            }
        }
        Ok(())
    }

    /// Regenerates one anchor sheet, replacing any existing one. Used when
    /// the sheet came out wrong; unlike the automatic pass, failures here
    /// propagate to the caller.
    pub async fn regenerate_anchor(
        &self,
        project: &mut Project,
        scene_id: &str,
        kind: AnchorKind,
    ) -> CoreResult<()> {
        let scene = project
            .scene(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let Some(metadata) = scene.metadata.clone() else {
            warn!("scene has no metadata, nothing to anchor");
            return Ok(());
        };

        let prompts = anchor_prompts(
            &metadata,
            &scene.shots,
            &project.assets,
            &project.continuity,
            &project.settings,
        );
        let request = match kind {
            AnchorKind::Costume => prompts.costume,
            AnchorKind::Environment => prompts.environment,
        };
        let Some(request) = request else {
            warn!("anchor preconditions not met, skipping regeneration");
            return Ok(());
        };

        let image = self
            .retry
            .execute(|| self.gateway.generate_image(&request))
            .await?;

        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        if let Some(metadata) = scene.metadata.as_mut() {
            match kind {
                AnchorKind::Costume => metadata.anchor_costume_image = Some(image),
                AnchorKind::Environment => metadata.anchor_environment_image = Some(image),
            }
        }
        Ok(())
    }

    /// Renders a single shot image and stores it with the prompt that
    /// produced it. Errors propagate; the previous image, if any, is kept.
    pub async fn generate_shot_image(
        &self,
        project: &mut Project,
        scene_id: &str,
        shot_id: &str,
    ) -> CoreResult<()> {
        let scene = project
            .scene(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let shot = scene
            .shot(shot_id)
            .ok_or_else(|| CoreError::ShotNotFound(shot_id.to_string()))?;
        let metadata = scene.metadata.clone().unwrap_or_default();

        let job = shot_image_prompt(
            shot,
            &metadata,
            &project.assets,
            &project.continuity,
            &project.settings,
        );
        let image = self
            .retry
            .execute(|| self.gateway.generate_image(&job.request))
            .await?;

        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let shot = scene
            .shot_mut(shot_id)
            .ok_or_else(|| CoreError::ShotNotFound(shot_id.to_string()))?;
        shot.image = Some(image);
        shot.generation_prompt = Some(job.prompt);
        Ok(())
    }

    /// Renders every shot of a scene: anchors first as a synchronization
    /// point, then shot images in concurrent batches with a pause between
    /// them.
    ///
    /// A shot that fails on a transient error is logged and left without an
    /// image; partial progress is never rolled back. A critical failure
    /// (dead credential, daily quota) aborts the pass immediately. The scene
    /// is marked visualized only when the pass ran to completion.
    pub async fn generate_scene_images(
        &self,
        project: &mut Project,
        scene_id: &str,
    ) -> CoreResult<()> {
        {
            let scene = project
                .scene_mut(scene_id)
                .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
            scene.loading = true;
        }

        let result = self.render_scene_shots(project, scene_id).await;

        if let Some(scene) = project.scene_mut(scene_id) {
            scene.loading = false;
            if result.is_ok() {
                scene.visualized = true;
            }
        }
        result
    }

    async fn render_scene_shots(&self, project: &mut Project, scene_id: &str) -> CoreResult<()> {
        self.generate_scene_anchors(project, scene_id).await?;

        // Requests are built against the post-anchor scene state, then the
        // shots render in batches; results merge back by shot id.
        let scene = project
            .scene(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let metadata = scene.metadata.clone().unwrap_or_default();
        let jobs: Vec<(ShotId, ShotImageRequest)> = scene
            .shots
            .iter()
            .map(|shot| {
                (
                    shot.id.clone(),
                    shot_image_prompt(
                        shot,
                        &metadata,
                        &project.assets,
                        &project.continuity,
                        &project.settings,
                    ),
                )
            })
            .collect();

        let batch_size = self.generation.batch_size.max(1) as usize;
        let mut pending = jobs.into_iter();
        loop {
            let batch: Vec<(ShotId, ShotImageRequest)> =
                pending.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let mut tasks = JoinSet::new();
            for (shot_id, job) in batch {
                let gateway = Arc::clone(&self.gateway);
                let retry = self.retry.clone();
                tasks.spawn(async move {
                    let ShotImageRequest { request, prompt } = job;
                    let result = retry.execute(|| gateway.generate_image(&request)).await;
                    (shot_id, prompt, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (shot_id, prompt, result) =
                    joined.map_err(|err| CoreError::Internal(err.to_string()))?;
                match result {
                    Ok(image) => {
                        if let Some(shot) = project
                            .scene_mut(scene_id)
                            .and_then(|scene| scene.shot_mut(&shot_id))
                        {
                            shot.image = Some(image);
                            shot.generation_prompt = Some(prompt);
                        }
                    }
                    Err(err) => {
                        if FailureKind::from_message(&err.to_message()).is_critical() {
                            return Err(err);
                        }
                        warn!("shot {} image generation failed: {}", shot_id, err);
                    }
                }
            }

            sleep(Duration::from_millis(self.generation.batch_pause_ms)).await;
        }

        info!("scene {} shot pass complete", scene_id);
        Ok(())
    }

    /// Clears every render of the scene and runs a fresh image pass.
    pub async fn reshoot_scene(&self, project: &mut Project, scene_id: &str) -> CoreResult<()> {
        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        scene.clear_renders();
        self.generate_scene_images(project, scene_id).await
    }
}

// =============================================================================
// Structural edits
// =============================================================================

/// Partial scene metadata as a rewrite or bridge reply carries it. Only the
/// fields the model actually returned overwrite; anchor images are never
/// touched.
#[derive(Debug, Clone, Default, Deserialize)]
struct MetadataPatch {
    setting: Option<String>,
    lighting: Option<String>,
    costume_rule: Option<String>,
    mood: Option<String>,
}

impl MetadataPatch {
    fn apply(self, metadata: &mut SceneMetadata) {
        if let Some(setting) = self.setting {
            metadata.setting = setting;
        }
        if let Some(lighting) = self.lighting {
            metadata.lighting = lighting;
        }
        if let Some(costume_rule) = self.costume_rule {
            metadata.costume_rule = costume_rule;
        }
        if let Some(mood) = self.mood {
            metadata.mood = mood;
        }
    }
}

/// A rewrite or bridging-scene reply.
#[derive(Debug, Clone, Default, Deserialize)]
struct SceneDraft {
    #[serde(default)]
    metadata: MetadataPatch,
    #[serde(default)]
    shots: Vec<PlannedShot>,
}

impl StudioEngine {
    /// Rewrites a scene's script in place.
    ///
    /// Description, dialogue, and camera come from the reply; focus,
    /// lighting, and effects are inherited position-wise from the current
    /// shots so asset links survive the rewrite. Rendered images are
    /// dropped and the scene needs a fresh visualize pass. A reply without
    /// shots leaves the scene untouched.
    pub async fn rewrite_scene(&self, project: &mut Project, scene_id: &str) -> CoreResult<()> {
        let scene = project
            .scene(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let scene_number = scene.scene_index.unwrap_or(0);

        let prompt = rewrite_scene_prompt(scene_number, &project.settings, &project.assets);
        let request = TextRequest::new(prompt).with_json_output(true);
        let reply = self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await?;

        let draft: SceneDraft = extract_json_object(&reply)?;
        if draft.shots.is_empty() {
            warn!("scene rewrite returned no shots, keeping current script");
            return Ok(());
        }

        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let old = std::mem::take(&mut scene.shots);
        scene.shots = draft
            .shots
            .into_iter()
            .enumerate()
            .map(|(i, planned)| {
                let previous = old.get(i);
                Shot::new(i as u32, planned.scene)
                    .with_dialogue(planned.dialogue)
                    .with_focus(previous.map(|shot| shot.focus).unwrap_or_default())
                    .with_camera(planned.camera)
                    .with_lighting(
                        previous
                            .map(|shot| shot.lighting.clone())
                            .unwrap_or_default(),
                    )
                    .with_sound_fx(
                        previous
                            .map(|shot| shot.sound_fx.clone())
                            .unwrap_or_default(),
                    )
            })
            .collect();

        // A rewrite may only move the setting and mood; the other rules and
        // the anchors stay.
        let metadata = scene.metadata.get_or_insert_with(SceneMetadata::default);
        if let Some(setting) = draft.metadata.setting {
            metadata.setting = setting;
        }
        if let Some(mood) = draft.metadata.mood {
            metadata.mood = mood;
        }
        scene.visualized = false;
        Ok(())
    }

    /// Inserts a bridging shot after the given one.
    ///
    /// A placeholder appears immediately, the bridge script call fills it,
    /// and the shot then renders. If the script call fails the placeholder
    /// is removed again; a transient render failure keeps the scripted shot
    /// without an image.
    pub async fn insert_shot(
        &self,
        project: &mut Project,
        scene_id: &str,
        after_shot_id: &str,
    ) -> CoreResult<ShotId> {
        let (request, placeholder) = {
            let scene = project
                .scene(scene_id)
                .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
            let position = scene
                .shots
                .iter()
                .position(|shot| shot.id == after_shot_id)
                .ok_or_else(|| CoreError::ShotNotFound(after_shot_id.to_string()))?;
            let previous = &scene.shots[position];
            let next = scene.shots.get(position + 1);
            let metadata = scene.metadata.clone().unwrap_or_default();

            let prompt = bridge_shot_prompt(
                previous,
                next,
                &metadata,
                &project.settings,
                &project.assets,
                &project.continuity,
            );
            let request = TextRequest::new(prompt).with_json_output(true);
            let placeholder = Shot::new(previous.index + 1, "Analyzing context & constraints...");
            (request, placeholder)
        };

        let shot_id = placeholder.id.clone();
        project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?
            .insert_shot_after(after_shot_id, placeholder)?;

        let reply = match self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                remove_shot_quietly(project, scene_id, &shot_id);
                return Err(err);
            }
        };
        let bridged: PlannedShot = match extract_json_object(&reply) {
            Ok(bridged) => bridged,
            Err(err) => {
                remove_shot_quietly(project, scene_id, &shot_id);
                return Err(err);
            }
        };

        {
            let scene = project
                .scene_mut(scene_id)
                .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
            let shot = scene
                .shot_mut(&shot_id)
                .ok_or_else(|| CoreError::ShotNotFound(shot_id.clone()))?;
            shot.visual_description = if bridged.scene.is_empty() {
                "Scene bridge...".to_string()
            } else {
                bridged.scene
            };
            shot.dialogue = bridged.dialogue;
            shot.focus = AssetRef::parse(&bridged.focus_char);
            shot.camera = bridged.camera;
            shot.lighting = bridged.lighting;
            shot.sound_fx = bridged.sound_fx;
        }

        match self.generate_shot_image(project, scene_id, &shot_id).await {
            Ok(()) => {}
            Err(err) if FailureKind::from_message(&err.to_message()).is_critical() => {
                return Err(err)
            }
            Err(err) => warn!("bridge shot render failed: {}", err),
        }
        Ok(shot_id)
    }

    /// Removes a shot; the remaining shots reindex contiguously from 0.
    pub fn remove_shot(
        &self,
        project: &mut Project,
        scene_id: &str,
        shot_id: &str,
    ) -> CoreResult<Shot> {
        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        scene.remove_shot(shot_id)
    }

    /// Inserts a bridging scene after the given one.
    ///
    /// The new scene inherits the previous scene's costume rule and costume
    /// anchor so the cast stays dressed consistently, but never the
    /// environment anchor, since the location is expected to change. The
    /// bridge script continues the previous scene's ending toward the next
    /// scene's opening, with the previous scene's closing frame attached as
    /// visual context when one exists. On any failure the inserted scene is
    /// removed again.
    pub async fn insert_scene(
        &self,
        project: &mut Project,
        after_scene_id: &str,
    ) -> CoreResult<SceneId> {
        let position = project
            .scene_position(after_scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(after_scene_id.to_string()))?;

        let (inherited, request, scene_index) = {
            let previous = &project.scenes[position];
            let prev_metadata = previous.metadata.clone().unwrap_or_default();
            let costume_rule = if prev_metadata.costume_rule.is_empty() {
                "Consistent".to_string()
            } else {
                prev_metadata.costume_rule.clone()
            };
            let mut inherited = SceneMetadata::new("New Scene", "Cinematic", costume_rule, "Neutral");
            inherited.anchor_costume_image = prev_metadata.anchor_costume_image.clone();

            let prev_last = previous.shots.last();
            let prev_ending = prev_last
                .map(|shot| shot.visual_description.as_str())
                .unwrap_or("Unknown");
            let prev_frame = prev_last.and_then(|shot| shot.last_frame.as_ref().or(shot.image.as_ref()));
            let next_starting = project
                .scenes
                .get(position + 1)
                .and_then(|scene| scene.shots.first())
                .map(|shot| shot.visual_description.as_str())
                .unwrap_or("End of story");

            let request = bridge_scene_prompt(
                prev_ending,
                next_starting,
                prev_frame,
                &project.settings,
                &project.assets,
                &project.continuity,
            )
            .with_json_output(true);
            let scene_index = previous.scene_index.unwrap_or(0) + 1;
            (inherited, request, scene_index)
        };

        let scene = Scene::story(scene_index).with_metadata(inherited.clone());
        let new_id = project.insert_scene_after(after_scene_id, scene)?;

        let reply = match self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                let _ = project.remove_scene(&new_id);
                return Err(err);
            }
        };
        let draft: SceneDraft = match extract_json_object(&reply) {
            Ok(draft) => draft,
            Err(err) => {
                let _ = project.remove_scene(&new_id);
                return Err(err);
            }
        };
        if draft.shots.is_empty() {
            let _ = project.remove_scene(&new_id);
            return Err(CoreError::ScriptEmpty);
        }

        let shots: Vec<Shot> = draft
            .shots
            .into_iter()
            .enumerate()
            .map(|(i, planned)| planned.into_shot(i as u32))
            .collect();

        let scene = project
            .scene_mut(&new_id)
            .ok_or_else(|| CoreError::SceneNotFound(new_id.clone()))?;
        let mut metadata = inherited;
        draft.metadata.apply(&mut metadata);
        scene.metadata = Some(metadata);
        scene.shots = shots;
        info!(scene_index, "bridging scene inserted");
        Ok(new_id)
    }
}

fn remove_shot_quietly(project: &mut Project, scene_id: &str, shot_id: &str) {
    if let Some(scene) = project.scene_mut(scene_id) {
        let _ = scene.remove_shot(shot_id);
    }
}

// =============================================================================
// End frames
// =============================================================================

impl StudioEngine {
    /// Plans and renders the shot's end frame from its start image.
    ///
    /// A text call resolves how the action ends, then an image edit moves
    /// the start frame to that state. Frame-to-frame video models pick the
    /// result up as the end keyframe.
    pub async fn generate_last_frame(
        &self,
        project: &mut Project,
        scene_id: &str,
        shot_id: &str,
    ) -> CoreResult<()> {
        let (start, action) = {
            let scene = project
                .scene(scene_id)
                .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
            let shot = scene
                .shot(shot_id)
                .ok_or_else(|| CoreError::ShotNotFound(shot_id.to_string()))?;
            let start = shot.image.clone().ok_or(CoreError::MissingStartFrame)?;
            (start, shot.visual_description.clone())
        };

        let plan_request = end_frame_plan_prompt(&action, Some(&start));
        let description = self
            .retry
            .execute(|| self.gateway.generate_text(&plan_request))
            .await?;
        let description = if description.trim().is_empty() {
            action
        } else {
            description
        };

        let job = last_frame_prompt(&start, &description, &project.settings);
        let image = self
            .retry
            .execute(|| self.gateway.generate_image(&job.request))
            .await?;

        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        let shot = scene
            .shot_mut(shot_id)
            .ok_or_else(|| CoreError::ShotNotFound(shot_id.to_string()))?;
        shot.last_frame = Some(image);
        Ok(())
    }
}

// =============================================================================
// Setup assistance
// =============================================================================

/// One-click configuration reply. Every field is optional; absent or empty
/// fields leave the current selection alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedConfig {
    genre: Option<String>,
    director: Option<String>,
    art_style: Option<String>,
    ref_work: Option<String>,
    premise: Option<String>,
    language: Option<String>,
    page_count: Option<u32>,
    aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OptionsReply {
    #[serde(default)]
    options: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PremiseReply {
    #[serde(default)]
    premise: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn aspect_from_label(label: &str) -> Option<AspectRatio> {
    match label.trim() {
        "1:1" => Some(AspectRatio::Square),
        "16:9" => Some(AspectRatio::Widescreen),
        "9:16" => Some(AspectRatio::Vertical),
        _ => None,
    }
}

impl StudioEngine {
    /// Fills the project setup with a model-recommended configuration.
    /// Only fields the model actually returned are applied; an unknown
    /// aspect label is ignored.
    pub async fn recommend_config(&self, settings: &mut ProjectSettings) -> CoreResult<()> {
        let request = TextRequest::new(recommend_config_prompt()).with_json_output(true);
        let reply = self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await?;
        let config: RecommendedConfig = extract_json_object(&reply)?;

        if let Some(genre) = non_empty(config.genre) {
            settings.genre = genre;
        }
        if let Some(director) = non_empty(config.director) {
            settings.style_director = director;
        }
        if let Some(art_style) = non_empty(config.art_style) {
            settings.style_art = art_style;
        }
        if let Some(ref_work) = non_empty(config.ref_work) {
            settings.style_reference = ref_work;
        }
        if let Some(premise) = non_empty(config.premise) {
            settings.premise = premise;
        }
        if let Some(language) = non_empty(config.language) {
            settings.language = language;
        }
        if let Some(page_count) = config.page_count.filter(|count| *count > 0) {
            settings.page_count = page_count;
        }
        if let Some(aspect) = config.aspect_ratio.as_deref().and_then(aspect_from_label) {
            settings.aspect_ratio = aspect;
        }
        Ok(())
    }

    /// Ten fresh options for one setup picker.
    pub async fn inspire_options(
        &self,
        settings: &ProjectSettings,
        kind: InspireKind,
    ) -> CoreResult<Vec<String>> {
        let request =
            TextRequest::new(inspire_options_prompt(kind, &settings.genre)).with_json_output(true);
        let reply = self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await?;
        let parsed: OptionsReply = extract_json_object(&reply)?;
        Ok(parsed.options)
    }

    /// A fresh premise for the current genre and director, applied to the
    /// settings when the model returned one.
    pub async fn inspire_premise(&self, settings: &mut ProjectSettings) -> CoreResult<String> {
        let request = TextRequest::new(inspire_premise_prompt(
            &settings.genre,
            &settings.style_director,
        ))
        .with_json_output(true);
        let reply = self
            .retry
            .execute(|| self.gateway.generate_text(&request))
            .await?;
        let parsed: PremiseReply = extract_json_object(&reply)?;
        if !parsed.premise.trim().is_empty() {
            settings.premise = parsed.premise.clone();
        }
        Ok(parsed.premise)
    }
}

// =============================================================================
// Tests
// =============================================================================
