//! Prompt assembly.
//!
//! Every generation call's exact wording lives here: the script planning
//! prompt, anchor sheets, shot images, end frames, bridging shots and
//! scenes, setup helpers, and the song concept. Builders return plain
//! strings or ready-to-submit gateway requests with reference images
//! already interleaved in submission order.

use crate::core::continuity::ContinuityState;
use crate::core::gateway::{ContentPart, ImageRequest, TextRequest};
use crate::core::project::{
    AssetKind, AssetLibrary, AssetRef, ProjectSettings, ReferenceAsset, SceneMetadata, Shot,
};
use crate::core::script::personas::persona_for_genre;
use crate::core::{language_prompt_name, lyric_language_name, AspectRatio, ImageData};

// =============================================================================
// Script planning
// =============================================================================

/// Project state the script planner reads.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub settings: &'a ProjectSettings,
    pub assets: &'a AssetLibrary,
    pub continuity: &'a ContinuityState,
}

/// One roster line for the planning prompt, e.g. `HERO-0 (Mara); HERO-1 (Jun)`.
/// Unnamed cast fall back to a generic label; props and locations keep
/// whatever name they have.
fn roster_line(
    assets: &AssetLibrary,
    kind: AssetKind,
    tag: &str,
    fallback: Option<&str>,
) -> String {
    assets
        .list(kind)
        .iter()
        .enumerate()
        .map(|(i, asset)| {
            let name = match fallback {
                Some(default) if asset.name.is_empty() => default,
                _ => asset.name.as_str(),
            };
            format!("{}-{} ({})", tag, i, name)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds the full script planning prompt: persona, project setup, visual
/// style lock, cast roster, and the workflow plus output schema the model
/// must follow.
pub fn plan_prompt(ctx: &PlanContext) -> String {
    let settings = ctx.settings;
    let persona = persona_for_genre(&settings.genre);
    let language = language_prompt_name(&settings.language);

    let cast = roster_line(ctx.assets, AssetKind::Hero, "HERO", Some("Protag"));
    let supports = roster_line(ctx.assets, AssetKind::Support, "SUPPORT", Some("Extra"));
    let items = roster_line(ctx.assets, AssetKind::Item, "ITEM", None);
    let locations = roster_line(ctx.assets, AssetKind::Location, "LOC", None);

    let mut prompt = String::new();
    prompt.push_str(&format!("ROLE: {}\n", persona.role));
    prompt.push_str(&format!("TASK: {}\n", persona.task_desc));
    prompt.push_str(&format!(
        "PROJECT: {}. PREMISE: {}.\n",
        settings.genre, settings.premise
    ));
    prompt.push_str(&format!(
        "ARTISTIC DIRECTION: {} {}.\n",
        settings.composite_style(),
        settings.custom_style
    ));
    prompt.push_str(&format!(
        "VISUAL STYLE ENFORCEMENT: {}\n",
        ctx.continuity.keywords
    ));
    prompt.push_str(&format!(
        "STYLE CATEGORY: {}\n",
        ctx.continuity.category.as_str()
    ));
    prompt.push_str(&format!(
        "{}\n",
        ctx.continuity.category.script_constraint()
    ));
    prompt.push_str(&format!("{}\n", persona.output_advice));
    prompt.push_str(&format!(
        "*** IMPORTANT: OUTPUT EVERYTHING IN {}.\n",
        language
    ));
    prompt.push_str(&format!(
        "ASSETS: CAST: {}, {}. PROPS: {}. LOCATIONS: {}.\n",
        cast, supports, items, locations
    ));
    prompt.push_str("WORKFLOW (Copy & Transcend):\n");
    prompt.push_str("1. [REFERENCE] Identify 3 masterpieces (2015-2025).\n");
    prompt.push_str("2. [TRANSCEND] Avoid clichés. Propose a unique twist.\n");
    prompt.push_str(&format!(
        "3. [SCENES] Create {} Scenes following: {}\n",
        settings.effective_scene_count(),
        persona.structure_guide
    ));
    prompt.push_str(
        "   - **DYNAMIC VIDEO PROMPTS**: For 'scene' description, describe movement: \"Start frame shows [X], then camera moves [Y], action evolves to [Z].\"\n",
    );
    prompt.push_str("   - SHOT COUNT: 3-8 shots per scene.\n");
    prompt.push_str(
        r#"OUTPUT JSON: {
  "bible": { "references": [], "strategy": "..." },
  "scenes": [ { "sceneIndex": 1, "metadata": { "setting": "...", "lighting": "...", "costume_rule": "...", "mood": "..." },
  "shots": [ { "scene": "Start frame: Hero walks in... then looks up...", "caption": "...", "dialogue": "...", "focus_char": "hero-0", "camera": "...", "lighting": "...", "sound_fx": "..." } ] } ]
}"#,
    );
    prompt
}

// =============================================================================
// Anchor sheets
// =============================================================================

/// Anchor requests for one scene; either side is absent when its
/// preconditions are not met.
#[derive(Debug, Clone, Default)]
pub struct AnchorPrompts {
    /// Costume sheet: single-hero character sheet or multi-hero group shot.
    pub costume: Option<ImageRequest>,
    /// Empty-set location concept art.
    pub environment: Option<ImageRequest>,
}

/// Builds the scene's anchor requests.
///
/// The costume sheet covers the heroes the scene's shots actually focus on,
/// in first appearance order, and needs a non-empty costume rule. The
/// environment sheet needs a usable setting. Anchors always render at 16:9
/// regardless of the project ratio.
pub fn anchor_prompts(
    metadata: &SceneMetadata,
    shots: &[Shot],
    assets: &AssetLibrary,
    continuity: &ContinuityState,
    settings: &ProjectSettings,
) -> AnchorPrompts {
    let prefix = continuity.category.anchor_prefix();

    let mut hero_indices: Vec<usize> = Vec::new();
    for shot in shots {
        if let AssetRef::Asset {
            kind: AssetKind::Hero,
            index,
        } = shot.focus
        {
            if !hero_indices.contains(&index) {
                hero_indices.push(index);
            }
        }
    }
    let heroes: Vec<(usize, &ReferenceAsset)> = hero_indices
        .iter()
        .filter_map(|&i| assets.get(AssetKind::Hero, i).map(|hero| (i, hero)))
        .collect();

    let costume = if !heroes.is_empty() && !metadata.costume_rule.is_empty() {
        let mut parts: Vec<ContentPart> = Vec::new();
        let prompt = if let [(_, hero)] = heroes.as_slice() {
            parts.push(ContentPart::Text("Keep Identity:".to_string()));
            parts.push(ContentPart::Image(hero.image.clone()));
            format!(
                "{} Full body Character Sheet. Identity: {}. Costume: {}. Style: {}. Flat background.",
                prefix, hero.name, metadata.costume_rule, settings.style_art
            )
        } else {
            let names = heroes
                .iter()
                .map(|(_, hero)| hero.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            for (i, hero) in &heroes {
                parts.push(ContentPart::Text(format!("HERO-{} Ref:", i)));
                parts.push(ContentPart::Image(hero.image.clone()));
            }
            format!(
                "{} Group Shot. Characters: {}. Costume: {}. Style: {}.",
                prefix, names, metadata.costume_rule, settings.style_art
            )
        };
        parts.push(ContentPart::Text(prompt));
        Some(ImageRequest::from_parts(parts, AspectRatio::Widescreen))
    } else {
        None
    };

    let environment = if !metadata.setting.is_empty() && metadata.setting != "None" {
        Some(ImageRequest::new(
            format!(
                "{} Empty Set, Location Concept Art. {}. Lighting: {}. Style: {}. No people.",
                prefix, metadata.setting, metadata.lighting, settings.style_art
            ),
            AspectRatio::Widescreen,
        ))
    } else {
        None
    };

    AnchorPrompts {
        costume,
        environment,
    }
}

// =============================================================================
// Shot images
// =============================================================================

/// An image request plus the bare prompt text, which is kept on the shot
/// for inspection after generation.
#[derive(Debug, Clone)]
pub struct ShotImageRequest {
    pub request: ImageRequest,
    pub prompt: String,
}

/// Builds the image request for one shot.
///
/// Reference images go first, each behind a label part: costume sheet (hero
/// focus only), the focus character's identity, the location anchor, then
/// any prop references. The prompt text closes the request.
pub fn shot_image_prompt(
    shot: &Shot,
    metadata: &SceneMetadata,
    assets: &AssetLibrary,
    continuity: &ContinuityState,
    settings: &ProjectSettings,
) -> ShotImageRequest {
    let mut parts: Vec<ContentPart> = Vec::new();
    let mut char_prompt = String::new();

    // Only cast members carry an identity; a prop or location focus renders
    // from the prompt text alone.
    if let AssetRef::Asset {
        kind: kind @ (AssetKind::Hero | AssetKind::Support),
        index,
    } = shot.focus
    {
        if let Some(asset) = assets.get(kind, index) {
            if kind == AssetKind::Hero {
                if let Some(costume) = &metadata.anchor_costume_image {
                    parts.push(ContentPart::Text("COSTUME REF:".to_string()));
                    parts.push(ContentPart::Image(costume.clone()));
                }
            }
            parts.push(ContentPart::Text("IDENTITY REF:".to_string()));
            parts.push(ContentPart::Image(asset.image.clone()));
            char_prompt = format!("IDENTITY: {}. ", asset.name);
        }
    }

    if let Some(environment) = &metadata.anchor_environment_image {
        parts.push(ContentPart::Text("LOCATION REF:".to_string()));
        parts.push(ContentPart::Image(environment.clone()));
    }

    if !metadata.extra_anchor_images.is_empty() {
        for (i, extra) in metadata.extra_anchor_images.iter().enumerate() {
            parts.push(ContentPart::Text(format!("PROP REF {}:", i)));
            parts.push(ContentPart::Image(extra.clone()));
        }
        char_prompt.push_str(" Include props.");
    }

    let prompt = format!(
        "[VISUAL BASE]: {} {} [CONTENT]: SETTING: {}. ACTION: {}. CHARACTERS: {}. [STYLE]: CAMERA: {}. LIGHTING: {}. ART DIRECTION: {} {}. NEGATIVE: {}.",
        continuity.category.image_prefix(),
        continuity.visual_base(&settings.genre),
        metadata.setting,
        shot.visual_description,
        char_prompt,
        shot.camera,
        shot.lighting,
        settings.composite_style(),
        settings.custom_style,
        continuity.category.negative_prompt(),
    );
    parts.push(ContentPart::Text(prompt.clone()));

    ShotImageRequest {
        request: ImageRequest::from_parts(parts, settings.aspect_ratio),
        prompt,
    }
}

/// Builds the end-frame image request: an edit of the start frame toward
/// the resolved action state. Style narrows to director and art style; the
/// reference work would fight the source image.
pub fn last_frame_prompt(
    start_frame: &ImageData,
    action_desc: &str,
    settings: &ProjectSettings,
) -> ShotImageRequest {
    let prompt = format!(
        "Final frame of the shot. ACTION END STATE: {}. STYLE: {} | {}. Maintain same characters and environment.",
        action_desc, settings.style_director, settings.style_art
    );
    let parts = vec![
        ContentPart::Image(start_frame.clone()),
        ContentPart::Text(prompt.clone()),
    ];
    ShotImageRequest {
        request: ImageRequest::from_parts(parts, settings.aspect_ratio),
        prompt,
    }
}

/// Builds the text request that plans an end frame before it is rendered.
/// The start image leads when available so the model resolves the actual
/// framing, not just the description.
pub fn end_frame_plan_prompt(action_desc: &str, start_frame: Option<&ImageData>) -> TextRequest {
    let mut prompt = String::new();
    prompt.push_str("ROLE: Director / Cinematographer.\n");
    prompt.push_str(
        "TASK: Describe the END FRAME of a video shot, given the START FRAME description.\n",
    );
    prompt.push_str(&format!("START FRAME: \"{}\"\n", action_desc));
    prompt.push_str(
        "CONTEXT: The shot lasts about 3-5 seconds. Describe how the action/camera movement resolves.\n",
    );
    prompt.push_str("OUTPUT: A concise visual description of the final frame.");

    let mut parts: Vec<ContentPart> = Vec::new();
    match start_frame {
        Some(image) => parts.push(ContentPart::Image(image.clone())),
        None => parts.push(ContentPart::Text("No image ref.".to_string())),
    }
    parts.push(ContentPart::Text(prompt));
    TextRequest::from_parts(parts)
}

// =============================================================================
// Scene editing
// =============================================================================

/// Builds the rewrite prompt for a scene. The reply schema carries only the
/// fields a rewrite may change; focus, lighting, and effects are inherited
/// from the existing shots.
pub fn rewrite_scene_prompt(
    scene_number: u32,
    settings: &ProjectSettings,
    assets: &AssetLibrary,
) -> String {
    let names = assets
        .list(AssetKind::Hero)
        .iter()
        .map(|hero| hero.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    prompt.push_str("ROLE: Script Editor.\n");
    prompt.push_str(&format!(
        "TASK: Rewrite the scene description and dialogue for Scene {}.\n",
        scene_number
    ));
    prompt.push_str(&format!(
        "CONTEXT: Premise: {}. Genre: {}.\n",
        settings.premise, settings.genre
    ));
    prompt.push_str(&format!("CHARACTERS: {}.\n", names));
    prompt.push_str("REQUIREMENT: Make it more dramatic/creative. Keep same character count.\n");
    prompt.push_str(&format!(
        "OUTPUT LANGUAGE: {} (STRICTLY - DO NOT USE ENGLISH unless requested).\n",
        language_prompt_name(&settings.language)
    ));
    prompt.push_str(
        r#"OUTPUT JSON: { "metadata": { "setting": "...", "mood": "..." }, "shots": [ { "scene": "...", "dialogue": "...", "camera": "..." } ... ] }"#,
    );
    prompt
}

/// Builds the bridging-shot prompt: a single shot inserted between two
/// existing shots under the scene's continuity constraints.
pub fn bridge_shot_prompt(
    prev_shot: &Shot,
    next_shot: Option<&Shot>,
    metadata: &SceneMetadata,
    settings: &ProjectSettings,
    assets: &AssetLibrary,
    continuity: &ContinuityState,
) -> String {
    let next_context = match next_shot {
        Some(shot) => format!("Next Shot Action: {}", shot.visual_description),
        None => "End of scene.".to_string(),
    };
    let characters = assets
        .list(AssetKind::Hero)
        .iter()
        .enumerate()
        .map(|(i, hero)| format!("hero-{} ({})", i, hero.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    prompt.push_str("ROLE: Director. TASK: Insert a bridging shot between two shots.\n");
    prompt.push_str("CONTEXT:\n");
    prompt.push_str(&format!(
        "- Prev Shot: \"{}\" (Focus: {}).\n",
        prev_shot.visual_description,
        prev_shot.focus.as_wire()
    ));
    prompt.push_str(&format!("- Next Context: {}.\n", next_context));
    prompt.push_str("CONSTRAINTS (MUST FOLLOW):\n");
    prompt.push_str(&format!("- Setting: {}\n", metadata.setting));
    prompt.push_str(&format!("- Costume: {}\n", metadata.costume_rule));
    prompt.push_str(&format!("- Lighting: {}\n", metadata.lighting));
    prompt.push_str(&format!(
        "- STYLE: {}\n",
        continuity.category.bridging_constraint()
    ));
    prompt.push_str(&format!(
        "VISUAL STYLE: {}.\n",
        continuity.bridging_style(&settings.genre)
    ));
    prompt.push_str(&format!("CHARACTERS: {}.\n", characters));
    prompt.push_str("REQUIREMENTS:\n");
    prompt.push_str("1. STRICT CONTINUITY with environment and costume.\n");
    prompt.push_str("2. Identify the focus character ID (e.g. \"hero-0\", \"hero-1\") or \"none\".\n");
    prompt.push_str(&format!(
        "3. OUTPUT LANGUAGE: {} (STRICTLY).\n",
        language_prompt_name(&settings.language)
    ));
    prompt.push_str(
        r#"OUTPUT JSON: {
  "scene": "Visual description...",
  "dialogue": "...",
  "focus_char": "hero-0",
  "camera": "...",
  "lighting": "...",
  "sound_fx": "..."
}"#,
    );
    prompt
}

/// Builds the bridging-scene request: a short scene connecting the previous
/// scene's ending to the next scene's opening. The previous scene's closing
/// frame, when available, leads the request behind a continuity note.
pub fn bridge_scene_prompt(
    prev_ending: &str,
    next_starting: &str,
    prev_frame: Option<&ImageData>,
    settings: &ProjectSettings,
    assets: &AssetLibrary,
    continuity: &ContinuityState,
) -> TextRequest {
    let names = assets
        .list(AssetKind::Hero)
        .iter()
        .map(|hero| hero.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    prompt.push_str(
        "ROLE: Screenwriter. TASK: Create a bridging scene that logically connects the previous scene to the next one.\n",
    );
    prompt.push_str(&format!("PREVIOUS SCENE ENDING: \"{}\".\n", prev_ending));
    prompt.push_str(&format!("NEXT SCENE STARTING: \"{}\".\n", next_starting));
    prompt.push_str(&format!("PREMISE: {}.\n", settings.premise));
    prompt.push_str(&format!("VISUAL STYLE: {}.\n", continuity.keywords));
    prompt.push_str(&format!(
        "STYLE CONSTRAINT: {}.\n",
        continuity.category.bridging_constraint()
    ));
    prompt.push_str(&format!("CHARACTERS: {}.\n", names));
    prompt.push_str("REQUIREMENT:\n");
    prompt.push_str("1. STRICTLY CONTINUE the plot from the Previous Scene.\n");
    prompt.push_str("2. Bridge the gap to the Next Scene.\n");
    prompt.push_str("3. Maintain character consistency.\n");
    prompt.push_str(&format!(
        "4. OUTPUT LANGUAGE: {} (STRICTLY).\n",
        language_prompt_name(&settings.language)
    ));
    prompt.push_str(
        r#"OUTPUT JSON: {
  "metadata": { "setting": "...", "lighting": "...", "costume_rule": "...", "mood": "..." },
  "shots": [
      { "scene": "...", "dialogue": "...", "focus_char": "hero-0", "camera": "...", "lighting": "...", "sound_fx": "..." },
      { "scene": "...", "dialogue": "...", "focus_char": "hero-0", "camera": "...", "lighting": "...", "sound_fx": "..." }
  ]
}"#,
    );

    let mut parts: Vec<ContentPart> = Vec::new();
    if let Some(frame) = prev_frame {
        parts.push(ContentPart::Text(
            "VISUAL CONTEXT (PREVIOUS SCENE END): Use this visual to ensure continuity in lighting and style for the NEW SCENE."
                .to_string(),
        ));
        parts.push(ContentPart::Image(frame.clone()));
    }
    parts.push(ContentPart::Text(prompt));
    TextRequest::from_parts(parts)
}

// =============================================================================
// Setup helpers
// =============================================================================

/// Prompt behind the one-click project configuration.
pub fn recommend_config_prompt() -> &'static str {
    r#"Act as a Creative Director. Recommend a unique, high-quality configuration for a new film project.
Select from varied genres (Sci-Fi, Fantasy, Noir, etc.).
Pick a famous director and art style that matches.
Create a catchy premise.
Output JSON:
{
    "genre": "string (one from common film genres)",
    "director": "string",
    "artStyle": "string",
    "refWork": "string",
    "premise": "string",
    "language": "en-US",
    "pageCount": 5,
    "aspectRatio": "16:9"
}"#
}

/// Which setup picker an inspiration call refills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspireKind {
    Genre,
    Director,
    Art,
    Work,
}

impl InspireKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspireKind::Genre => "GENRE",
            InspireKind::Director => "DIRECTOR",
            InspireKind::Art => "ART",
            InspireKind::Work => "WORK",
        }
    }
}

/// Prompt for ten fresh picker options of one kind.
pub fn inspire_options_prompt(kind: InspireKind, genre: &str) -> String {
    format!(
        "Generate 10 creative and distinct options for: {}.\nContext: Film creation. Genre context: {}.\nReturn JSON: {{ \"options\": [\"opt1\", \"opt2\", ...] }}",
        kind.as_str(),
        genre
    )
}

/// Prompt for a fresh premise matching the current genre and director.
pub fn inspire_premise_prompt(genre: &str, director: &str) -> String {
    format!(
        "Generate a compelling, unique movie premise (logline).\nGenre: {}. Director Style: {}.\nOutput JSON: {{ \"premise\": \"string\" }}",
        genre, director
    )
}

// =============================================================================
// Music
// =============================================================================

/// Prompt for the song concept: title, style tags, and lyrics in the
/// requested lyric language.
pub fn music_concept_prompt(settings: &ProjectSettings, lyric_language: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("Act as a Professional Songwriter and Composer.\n");
    prompt.push_str(&format!(
        "Project: {} Film. Premise: {}.\n",
        settings.genre, settings.premise
    ));
    prompt.push_str("Task: Create a song concept.\n");
    prompt.push_str("1. Title (Creative)\n");
    prompt.push_str(
        "2. Style Tags (Genre, Mood, Instruments, Tempo - e.g. \"Cinematic, Epic, Orchestral, Female Vocals\")\n",
    );
    prompt.push_str(&format!(
        "3. Lyrics (Verse 1, Chorus) in {}.\n",
        lyric_language_name(lyric_language)
    ));
    prompt.push_str(r#"Output JSON: { "title": "...", "tags": "...", "lyrics": "..." }"#);
    prompt
}

// =============================================================================
// Tests
// =============================================================================
