//! Script Module
//!
//! Turns project setup into a shot-by-shot screenplay: director personas,
//! prompt assembly for every generation call, and tolerant parsing of the
//! model's JSON replies.

pub mod json;
pub mod personas;
pub mod plan;
pub mod prompts;

pub use json::extract_json_object;
pub use personas::{persona_for_genre, DirectorPersona};
pub use plan::{PlannedScene, PlannedShot, ScriptPlan, StoryBible};
pub use prompts::{
    anchor_prompts, bridge_scene_prompt, bridge_shot_prompt, end_frame_plan_prompt,
    inspire_options_prompt, inspire_premise_prompt, last_frame_prompt, music_concept_prompt,
    plan_prompt, recommend_config_prompt, rewrite_scene_prompt, shot_image_prompt, AnchorPrompts,
    InspireKind, PlanContext, ShotImageRequest,
};
