//! Scenes and Shots
//!
//! The storyboard structure: a project is an ordered list of scenes, each
//! holding metadata (setting, lighting, costume rule, mood, anchor images)
//! and an ordered list of shots. Shot indices stay contiguous from 0 after
//! every structural edit.

use serde::{Deserialize, Serialize};

use super::assets::{AssetRef, MAX_EXTRA_ANCHORS};
use crate::core::{CoreError, CoreResult, ImageData, SceneId, ShotId};

// =============================================================================
// Shots
// =============================================================================

/// Lifecycle of a shot's video clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    #[default]
    Idle,
    Generating,
    Done,
    Error,
}

/// A rendered video clip, materialized to bytes.
#[derive(Debug, Clone)]
pub struct VideoClip {
    pub bytes: Vec<u8>,
    pub mime: String,
    /// Relay URL the clip was fetched from. Expires; kept for diagnostics.
    pub source_url: String,
}

impl VideoClip {
    pub fn new(bytes: Vec<u8>, source_url: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: "video/mp4".to_string(),
            source_url: source_url.into(),
        }
    }
}

/// One storyboard shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    pub id: ShotId,
    /// Position within the scene, contiguous from 0.
    pub index: u32,
    /// Visual action description; the core of every prompt.
    pub visual_description: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub dialogue: String,
    #[serde(default)]
    pub focus: AssetRef,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub lighting: String,
    #[serde(default)]
    pub sound_fx: String,
    #[serde(default)]
    pub image: Option<ImageData>,
    #[serde(default)]
    pub last_frame: Option<ImageData>,
    /// Materialized clip. Not persisted; relay URLs expire and the bytes
    /// belong in the media directory, not the snapshot.
    #[serde(skip)]
    pub video: Option<VideoClip>,
    #[serde(default)]
    pub video_status: VideoStatus,
    /// Whether the clip's own audio plays in the edit.
    #[serde(default)]
    pub audio_enabled: bool,
    /// Prompt that produced the current image, kept for regeneration.
    #[serde(default)]
    pub generation_prompt: Option<String>,
}

impl Shot {
    pub fn new(index: u32, visual_description: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            index,
            visual_description: visual_description.into(),
            caption: String::new(),
            dialogue: String::new(),
            focus: AssetRef::None,
            camera: String::new(),
            lighting: String::new(),
            sound_fx: String::new(),
            image: None,
            last_frame: None,
            video: None,
            video_status: VideoStatus::Idle,
            audio_enabled: false,
            generation_prompt: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.dialogue = dialogue.into();
        self
    }

    pub fn with_focus(mut self, focus: AssetRef) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_camera(mut self, camera: impl Into<String>) -> Self {
        self.camera = camera.into();
        self
    }

    pub fn with_lighting(mut self, lighting: impl Into<String>) -> Self {
        self.lighting = lighting.into();
        self
    }

    pub fn with_sound_fx(mut self, sound_fx: impl Into<String>) -> Self {
        self.sound_fx = sound_fx.into();
        self
    }

    /// Drops rendered image and video, returning the shot to a pre-render
    /// state. The last frame survives; it is an authored end-state.
    pub fn clear_renders(&mut self) {
        self.image = None;
        self.video = None;
        self.video_status = VideoStatus::Idle;
        self.generation_prompt = None;
    }
}

// =============================================================================
// Scene metadata
// =============================================================================

/// Per-scene continuity data: the textual rules the planner set and the
/// generated anchor images shots are conditioned on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneMetadata {
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub lighting: String,
    #[serde(default)]
    pub costume_rule: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub anchor_costume_image: Option<ImageData>,
    #[serde(default)]
    pub anchor_environment_image: Option<ImageData>,
    /// User-supplied prop/VFX references, capped at [`MAX_EXTRA_ANCHORS`].
    #[serde(default)]
    pub extra_anchor_images: Vec<ImageData>,
}

impl SceneMetadata {
    pub fn new(
        setting: impl Into<String>,
        lighting: impl Into<String>,
        costume_rule: impl Into<String>,
        mood: impl Into<String>,
    ) -> Self {
        Self {
            setting: setting.into(),
            lighting: lighting.into(),
            costume_rule: costume_rule.into(),
            mood: mood.into(),
            anchor_costume_image: None,
            anchor_environment_image: None,
            extra_anchor_images: Vec::new(),
        }
    }

    /// Adds a prop anchor; returns false when the cap is reached.
    pub fn push_extra_anchor(&mut self, image: ImageData) -> bool {
        if self.extra_anchor_images.len() >= MAX_EXTRA_ANCHORS {
            return false;
        }
        self.extra_anchor_images.push(image);
        true
    }
}

// =============================================================================
// Scenes
// =============================================================================

/// Role of a scene within the film.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Opening key visual / poster.
    Cover,
    /// Regular story scene.
    Story,
    /// End title card.
    BackCover,
}

/// One scene of the storyboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub kind: SceneKind,
    /// 1-based story position; cover and back cover carry none.
    #[serde(default)]
    pub scene_index: Option<u32>,
    #[serde(default)]
    pub metadata: Option<SceneMetadata>,
    #[serde(default)]
    pub shots: Vec<Shot>,
    #[serde(default)]
    pub choices: Vec<String>,
    /// True once a full image pass completed for the current shots.
    #[serde(default)]
    pub visualized: bool,
    /// True while a generation pass is running.
    #[serde(default, skip_serializing)]
    pub loading: bool,
}

impl Scene {
    pub fn new(kind: SceneKind) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            scene_index: None,
            metadata: None,
            shots: Vec::new(),
            choices: Vec::new(),
            visualized: false,
            loading: false,
        }
    }

    pub fn story(scene_index: u32) -> Self {
        let mut scene = Self::new(SceneKind::Story);
        scene.scene_index = Some(scene_index);
        scene
    }

    pub fn with_metadata(mut self, metadata: SceneMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_shots(mut self, shots: Vec<Shot>) -> Self {
        self.shots = shots;
        self.reindex_shots();
        self
    }

    pub fn shot(&self, shot_id: &str) -> Option<&Shot> {
        self.shots.iter().find(|shot| shot.id == shot_id)
    }

    pub fn shot_mut(&mut self, shot_id: &str) -> Option<&mut Shot> {
        self.shots.iter_mut().find(|shot| shot.id == shot_id)
    }

    /// Inserts a shot directly after the given one and reindexes.
    pub fn insert_shot_after(&mut self, after_shot_id: &str, shot: Shot) -> CoreResult<()> {
        let position = self
            .shots
            .iter()
            .position(|s| s.id == after_shot_id)
            .ok_or_else(|| CoreError::ShotNotFound(after_shot_id.to_string()))?;
        self.shots.insert(position + 1, shot);
        self.reindex_shots();
        Ok(())
    }

    /// Removes a shot by id and reindexes.
    pub fn remove_shot(&mut self, shot_id: &str) -> CoreResult<Shot> {
        let position = self
            .shots
            .iter()
            .position(|s| s.id == shot_id)
            .ok_or_else(|| CoreError::ShotNotFound(shot_id.to_string()))?;
        let removed = self.shots.remove(position);
        self.reindex_shots();
        Ok(removed)
    }

    /// Replaces a shot in place by id.
    pub fn replace_shot(&mut self, shot: Shot) -> CoreResult<()> {
        let position = self
            .shots
            .iter()
            .position(|s| s.id == shot.id)
            .ok_or_else(|| CoreError::ShotNotFound(shot.id.clone()))?;
        self.shots[position] = shot;
        self.reindex_shots();
        Ok(())
    }

    fn reindex_shots(&mut self) {
        for (index, shot) in self.shots.iter_mut().enumerate() {
            shot.index = index as u32;
        }
    }

    /// Clears every shot's renders and resets the visualized flag; the
    /// first step of a reshoot.
    pub fn clear_renders(&mut self) {
        for shot in &mut self.shots {
            shot.clear_renders();
        }
        self.visualized = false;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_shots(n: usize) -> Scene {
        let shots = (0..n)
            .map(|i| Shot::new(i as u32, format!("shot {}", i)))
            .collect();
        Scene::story(1).with_shots(shots)
    }

    #[test]
    fn test_insert_shot_keeps_indices_contiguous() {
        let mut scene = scene_with_shots(3);
        let after_id = scene.shots[0].id.clone();

        scene
            .insert_shot_after(&after_id, Shot::new(0, "bridge"))
            .unwrap();

        assert_eq!(scene.shots.len(), 4);
        assert_eq!(scene.shots[1].visual_description, "bridge");
        let indices: Vec<u32> = scene.shots.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_insert_after_unknown_shot_fails() {
        let mut scene = scene_with_shots(2);
        let result = scene.insert_shot_after("missing", Shot::new(0, "x"));
        assert!(matches!(result, Err(CoreError::ShotNotFound(_))));
        assert_eq!(scene.shots.len(), 2);
    }

    #[test]
    fn test_remove_shot_reindexes() {
        let mut scene = scene_with_shots(3);
        let middle_id = scene.shots[1].id.clone();

        let removed = scene.remove_shot(&middle_id).unwrap();
        assert_eq!(removed.visual_description, "shot 1");

        let indices: Vec<u32> = scene.shots.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(scene.shots[1].visual_description, "shot 2");
    }

    #[test]
    fn test_clear_renders_resets_visual_state() {
        let mut scene = scene_with_shots(2);
        scene.visualized = true;
        for shot in &mut scene.shots {
            shot.image = Some(ImageData::new("image/png", vec![1]));
            shot.last_frame = Some(ImageData::new("image/png", vec![2]));
            shot.video = Some(VideoClip::new(vec![3], "mock://clip"));
            shot.video_status = VideoStatus::Done;
            shot.generation_prompt = Some("old".to_string());
        }

        scene.clear_renders();

        assert!(!scene.visualized);
        for shot in &scene.shots {
            assert!(shot.image.is_none());
            assert!(shot.video.is_none());
            assert_eq!(shot.video_status, VideoStatus::Idle);
            assert!(shot.generation_prompt.is_none());
            // Authored end frames survive a reshoot.
            assert!(shot.last_frame.is_some());
        }
    }

    #[test]
    fn test_extra_anchor_cap() {
        let mut metadata = SceneMetadata::new("Set", "Soft", "Coats", "Calm");
        for i in 0..MAX_EXTRA_ANCHORS {
            assert!(metadata.push_extra_anchor(ImageData::new("image/png", vec![i as u8])));
        }
        assert!(!metadata.push_extra_anchor(ImageData::new("image/png", vec![9])));
        assert_eq!(metadata.extra_anchor_images.len(), MAX_EXTRA_ANCHORS);
    }

    #[test]
    fn test_shot_serde_skips_video_bytes() {
        let mut shot = Shot::new(0, "action");
        shot.video = Some(VideoClip::new(vec![1, 2, 3], "mock://clip"));
        shot.video_status = VideoStatus::Done;

        let json = serde_json::to_string(&shot).unwrap();
        assert!(!json.contains("source_url"));

        let parsed: Shot = serde_json::from_str(&json).unwrap();
        assert!(parsed.video.is_none());
        assert_eq!(parsed.video_status, VideoStatus::Done);
    }

    #[test]
    fn test_shot_deserializes_with_defaults() {
        let parsed: Shot = serde_json::from_str(
            r#"{"id": "s1", "index": 0, "visual_description": "a duel at dawn"}"#,
        )
        .unwrap();
        assert_eq!(parsed.focus, AssetRef::None);
        assert_eq!(parsed.video_status, VideoStatus::Idle);
        assert!(!parsed.audio_enabled);
    }
}
