//! Project aggregate
//!
//! The root state of a film project: settings, the reference asset library,
//! the scene list, the detected continuity state, and the optional soundtrack.
//! All scene-graph mutations go through id-addressed replace operations so
//! concurrent generation passes merge against the latest state.

pub mod assets;
pub mod catalog;
pub mod scene;
pub mod snapshot;

pub use assets::*;
pub use scene::*;
pub use snapshot::*;

use serde::{Deserialize, Serialize};

use crate::core::continuity::ContinuityState;
use crate::core::{AspectRatio, CoreError, CoreResult, SceneId};

// =============================================================================
// Settings
// =============================================================================

/// Creative configuration chosen at setup time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub genre: String,
    /// Director / auteur descriptor.
    pub style_director: String,
    /// Art movement / medium descriptor.
    pub style_art: String,
    /// Reference work descriptor.
    pub style_reference: String,
    /// Free-form style addendum appended after the composite descriptor.
    #[serde(default)]
    pub custom_style: String,
    /// BCP47-ish dialogue language code, e.g. `zh-CN`.
    pub language: String,
    /// Requested story scene count; 0 lets the planner pick.
    pub page_count: u32,
    pub aspect_ratio: AspectRatio,
    pub premise: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            genre: catalog::default_genre().to_string(),
            style_director: catalog::default_director().to_string(),
            style_art: catalog::default_art_style().to_string(),
            style_reference: catalog::default_reference_work().to_string(),
            custom_style: String::new(),
            language: "zh-CN".to_string(),
            page_count: catalog::PAGE_COUNTS[1],
            aspect_ratio: AspectRatio::Widescreen,
            premise: String::new(),
        }
    }
}

impl ProjectSettings {
    /// The three style descriptors joined for prompts and the snapshot.
    pub fn composite_style(&self) -> String {
        format!(
            "{} | {} | {}",
            self.style_director, self.style_art, self.style_reference
        )
    }

    /// Story scene count the planner targets. A request for 0 means
    /// "let the agent decide", which resolves to 6.
    pub fn effective_scene_count(&self) -> u32 {
        if self.page_count == 0 {
            6
        } else {
            self.page_count
        }
    }

    /// Restores the three descriptors from a joined snapshot string. A
    /// string without all three parts lands wholesale in the director slot.
    pub fn apply_style_label(&mut self, label: &str) {
        let parts: Vec<&str> = label.split('|').map(str::trim).collect();
        if parts.len() == 3 {
            self.style_director = parts[0].to_string();
            self.style_art = parts[1].to_string();
            self.style_reference = parts[2].to_string();
        } else {
            self.style_director = label.trim().to_string();
        }
    }
}

// =============================================================================
// Audio
// =============================================================================

/// The project's generated soundtrack. A new generation replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioTrack {
    pub title: String,
    /// Comma-separated genre/mood/instrument tags fed to the music model.
    pub style_tags: String,
    pub lyrics: String,
    /// The submission prompt actually sent, kept for regeneration.
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing)]
    pub loading: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Project
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub settings: ProjectSettings,
    #[serde(default)]
    pub assets: AssetLibrary,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub continuity: ContinuityState,
    #[serde(default)]
    pub audio: Option<AudioTrack>,
    /// Masterpiece the planner chose to study, shown as provenance.
    #[serde(default)]
    pub masterpiece_ref: Option<String>,
}

impl Project {
    pub fn new(settings: ProjectSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn scene(&self, scene_id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.id == scene_id)
    }

    pub fn scene_mut(&mut self, scene_id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|scene| scene.id == scene_id)
    }

    pub fn scene_position(&self, scene_id: &str) -> Option<usize> {
        self.scenes.iter().position(|scene| scene.id == scene_id)
    }

    /// Replaces a scene wholesale by id; the merge step after a generation
    /// pass completes.
    pub fn replace_scene(&mut self, scene: Scene) -> CoreResult<()> {
        let position = self
            .scene_position(&scene.id)
            .ok_or_else(|| CoreError::SceneNotFound(scene.id.clone()))?;
        self.scenes[position] = scene;
        Ok(())
    }

    /// Inserts a scene directly after the given one.
    pub fn insert_scene_after(&mut self, after_scene_id: &str, scene: Scene) -> CoreResult<SceneId> {
        let position = self
            .scene_position(after_scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(after_scene_id.to_string()))?;
        let id = scene.id.clone();
        self.scenes.insert(position + 1, scene);
        Ok(id)
    }

    pub fn remove_scene(&mut self, scene_id: &str) -> CoreResult<Scene> {
        let position = self
            .scene_position(scene_id)
            .ok_or_else(|| CoreError::SceneNotFound(scene_id.to_string()))?;
        Ok(self.scenes.remove(position))
    }

    /// Story scenes only, in order; covers excluded.
    pub fn story_scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes
            .iter()
            .filter(|scene| scene.kind == SceneKind::Story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_style_joins_three_descriptors() {
        let settings = ProjectSettings {
            style_director: "Wong Kar-wai (王家卫)".to_string(),
            style_art: "Film Noir (黑色电影)".to_string(),
            style_reference: "In the Mood for Love".to_string(),
            ..ProjectSettings::default()
        };
        assert_eq!(
            settings.composite_style(),
            "Wong Kar-wai (王家卫) | Film Noir (黑色电影) | In the Mood for Love"
        );
    }

    #[test]
    fn test_apply_style_label_round_trips() {
        let mut settings = ProjectSettings::default();
        let label = settings.composite_style();
        let mut restored = ProjectSettings::default();
        restored.apply_style_label(&label);
        assert_eq!(restored.style_director, settings.style_director);
        assert_eq!(restored.style_art, settings.style_art);
        assert_eq!(restored.style_reference, settings.style_reference);

        settings.apply_style_label("just one descriptor");
        assert_eq!(settings.style_director, "just one descriptor");
    }

    #[test]
    fn test_effective_scene_count_zero_means_six() {
        let mut settings = ProjectSettings::default();
        settings.page_count = 0;
        assert_eq!(settings.effective_scene_count(), 6);
        settings.page_count = 5;
        assert_eq!(settings.effective_scene_count(), 5);
    }

    #[test]
    fn test_scene_insert_and_remove_by_id() {
        let mut project = Project::new(ProjectSettings::default());
        project.scenes.push(Scene::new(SceneKind::Cover));
        project.scenes.push(Scene::story(1));
        let anchor_id = project.scenes[0].id.clone();

        let inserted_id = project
            .insert_scene_after(&anchor_id, Scene::story(99))
            .unwrap();
        assert_eq!(project.scenes[1].id, inserted_id);

        let removed = project.remove_scene(&inserted_id).unwrap();
        assert_eq!(removed.scene_index, Some(99));
        assert!(project.scene(&inserted_id).is_none());

        assert!(matches!(
            project.remove_scene("missing"),
            Err(CoreError::SceneNotFound(_))
        ));
    }

    #[test]
    fn test_replace_scene_merges_by_id() {
        let mut project = Project::new(ProjectSettings::default());
        project.scenes.push(Scene::story(1));
        let mut updated = project.scenes[0].clone();
        updated.visualized = true;

        project.replace_scene(updated).unwrap();
        assert!(project.scenes[0].visualized);
    }
}
