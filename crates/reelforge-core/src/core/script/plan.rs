//! Script plan payload.
//!
//! Serde model of the planner's JSON reply and its conversion into the
//! project's scene list. Every field is tolerant: the model drops or
//! mislabels fields often enough that a partial plan must still load.

use serde::Deserialize;

use crate::core::project::{
    AssetRef, ProjectSettings, Scene, SceneKind, SceneMetadata, Shot,
};

/// Reference research the planner did before writing scenes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryBible {
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub strategy: String,
}

/// One shot as the planner wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannedShot {
    /// Start-frame-to-motion description; doubles as the video prompt.
    #[serde(default)]
    pub scene: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub dialogue: String,
    /// Wire-form focus ref such as `hero-0`; anything unparseable means no
    /// focus.
    #[serde(default)]
    pub focus_char: String,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub lighting: String,
    #[serde(default)]
    pub sound_fx: String,
}

impl PlannedShot {
    pub(crate) fn into_shot(self, index: u32) -> Shot {
        Shot::new(index, self.scene)
            .with_caption(self.caption)
            .with_dialogue(self.dialogue)
            .with_focus(AssetRef::parse(&self.focus_char))
            .with_camera(self.camera)
            .with_lighting(self.lighting)
            .with_sound_fx(self.sound_fx)
    }
}

/// One scene as the planner wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannedScene {
    /// The planner's own numbering; ignored in favor of list position.
    #[serde(default, rename = "sceneIndex")]
    pub scene_index: u32,
    #[serde(default)]
    pub metadata: SceneMetadata,
    #[serde(default)]
    pub shots: Vec<PlannedShot>,
}

impl PlannedScene {
    fn into_story_scene(self, story_index: u32) -> Scene {
        let shots = self
            .shots
            .into_iter()
            .enumerate()
            .map(|(i, shot)| shot.into_shot(i as u32))
            .collect();
        Scene::story(story_index)
            .with_metadata(self.metadata)
            .with_shots(shots)
    }
}

/// The planner's full reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptPlan {
    #[serde(default)]
    pub bible: StoryBible,
    #[serde(default)]
    pub scenes: Vec<PlannedScene>,
}

impl ScriptPlan {
    /// True when the planner produced no scenes at all.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// First bible reference, formatted for the project's masterpiece field.
    pub fn masterpiece_ref(&self) -> Option<String> {
        self.bible
            .references
            .first()
            .map(|reference| format!("{} (Inspired)", reference))
    }

    /// Converts the plan into the full scene list: a poster cover, the story
    /// scenes in plan order, and an end-title back cover.
    pub fn into_scenes(self, settings: &ProjectSettings, has_heroes: bool) -> Vec<Scene> {
        let mut scenes = Vec::with_capacity(self.scenes.len() + 2);
        scenes.push(cover_scene(settings, has_heroes));
        for (i, planned) in self.scenes.into_iter().enumerate() {
            scenes.push(planned.into_story_scene(i as u32 + 1));
        }
        scenes.push(back_cover_scene());
        scenes
    }
}

/// Poster scene opening the film. The title line truncates the premise to
/// its first 20 characters.
fn cover_scene(settings: &ProjectSettings, has_heroes: bool) -> Scene {
    let title: String = settings.premise.chars().take(20).collect();
    let focus = if has_heroes {
        AssetRef::hero(0)
    } else {
        AssetRef::None
    };
    let poster = Shot::new(
        0,
        format!(
            "Movie Poster for {} movie. Title: {}... . High quality, main character featured.",
            settings.genre, title
        ),
    )
    .with_focus(focus);

    Scene::new(SceneKind::Cover)
        .with_metadata(SceneMetadata::new(
            "Key Visual / Poster Background",
            "Dramatic Studio Lighting",
            "Signature Outfit",
            "Epic, Cinematic",
        ))
        .with_shots(vec![poster])
}

/// End-title scene closing the film.
fn back_cover_scene() -> Scene {
    let card = Shot::new(
        0,
        "End Title Card. Cinematic Typography. Credits. Consistent Art Style.",
    );
    Scene::new(SceneKind::BackCover)
        .with_metadata(SceneMetadata::new(
            "Black screen or abstract background",
            "Dramatic Studio Lighting",
            "Signature Outfit",
            "Quiet, Final",
        ))
        .with_shots(vec![card])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::extract_json_object;

    fn planner_reply(scene_count: usize) -> String {
        let scenes = (1..=scene_count)
            .map(|i| {
                format!(
                    r#"{{ "sceneIndex": {i}, "metadata": {{ "setting": "Set {i}", "lighting": "Soft", "costume_rule": "Coat", "mood": "Calm" }},
                        "shots": [
                            {{ "scene": "Start frame: open {i}", "dialogue": "hi", "focus_char": "HERO-0", "camera": "Wide", "lighting": "Soft", "sound_fx": "Wind" }},
                            {{ "scene": "Start frame: close {i}", "focus_char": "none" }},
                            {{ "scene": "Start frame: linger {i}" }}
                        ] }}"#
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        format!(
            r#"```json
{{ "bible": {{ "references": ["Blade Runner 2049", "Arrival"], "strategy": "slow burn" }}, "scenes": [{scenes}] }}
```"#
        )
    }

    fn settings() -> ProjectSettings {
        ProjectSettings {
            genre: "Sci-Fi".to_string(),
            premise: "A cartographer maps a city that redraws itself every night".to_string(),
            ..ProjectSettings::default()
        }
    }

    #[test]
    fn test_five_scene_plan_becomes_seven_scenes() {
        let plan: ScriptPlan = extract_json_object(&planner_reply(5)).unwrap();
        assert!(!plan.is_empty());

        let scenes = plan.into_scenes(&settings(), true);
        assert_eq!(scenes.len(), 7);
        assert_eq!(scenes[0].kind, SceneKind::Cover);
        assert_eq!(scenes[6].kind, SceneKind::BackCover);
        for (i, scene) in scenes[1..6].iter().enumerate() {
            assert_eq!(scene.kind, SceneKind::Story);
            assert_eq!(scene.scene_index, Some(i as u32 + 1));
            let indices: Vec<u32> = scene.shots.iter().map(|s| s.index).collect();
            assert_eq!(indices, vec![0, 1, 2]);
        }
    }

    #[test]
    fn test_planned_shot_fields_carry_over() {
        let plan: ScriptPlan = extract_json_object(&planner_reply(1)).unwrap();
        let scenes = plan.into_scenes(&settings(), true);

        let story = &scenes[1];
        let metadata = story.metadata.as_ref().unwrap();
        assert_eq!(metadata.setting, "Set 1");
        assert_eq!(metadata.costume_rule, "Coat");

        let first = &story.shots[0];
        assert_eq!(first.visual_description, "Start frame: open 1");
        assert_eq!(first.dialogue, "hi");
        assert_eq!(first.focus, AssetRef::hero(0));
        assert_eq!(first.camera, "Wide");
        assert_eq!(first.sound_fx, "Wind");

        // Sparse shots fall back to empty fields and no focus.
        assert_eq!(story.shots[1].focus, AssetRef::None);
        assert_eq!(story.shots[2].dialogue, "");
    }

    #[test]
    fn test_masterpiece_ref_uses_first_reference() {
        let plan: ScriptPlan = extract_json_object(&planner_reply(1)).unwrap();
        assert_eq!(
            plan.masterpiece_ref().as_deref(),
            Some("Blade Runner 2049 (Inspired)")
        );

        let empty = ScriptPlan::default();
        assert!(empty.masterpiece_ref().is_none());
    }

    #[test]
    fn test_cover_poster_truncates_premise() {
        let scenes = ScriptPlan::default().into_scenes(&settings(), true);
        let poster = &scenes[0].shots[0];
        assert_eq!(
            poster.visual_description,
            "Movie Poster for Sci-Fi movie. Title: A cartographer maps ... . High quality, main character featured."
        );
        assert_eq!(poster.focus, AssetRef::hero(0));
        assert_eq!(
            scenes[0].metadata.as_ref().unwrap().setting,
            "Key Visual / Poster Background"
        );
    }

    #[test]
    fn test_cover_without_heroes_has_no_focus() {
        let scenes = ScriptPlan::default().into_scenes(&settings(), false);
        assert_eq!(scenes[0].shots[0].focus, AssetRef::None);
    }

    #[test]
    fn test_back_cover_inherits_poster_costume() {
        let scenes = ScriptPlan::default().into_scenes(&settings(), true);
        let back = scenes.last().unwrap();
        let metadata = back.metadata.as_ref().unwrap();
        assert_eq!(metadata.setting, "Black screen or abstract background");
        assert_eq!(metadata.mood, "Quiet, Final");
        assert_eq!(metadata.costume_rule, "Signature Outfit");
        assert_eq!(
            back.shots[0].visual_description,
            "End Title Card. Cinematic Typography. Credits. Consistent Art Style."
        );
    }

    #[test]
    fn test_empty_plan_detection() {
        let plan: ScriptPlan = extract_json_object("{}").unwrap();
        assert!(plan.is_empty());
    }
}
