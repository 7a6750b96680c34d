//! Visual Continuity
//!
//! Classifies the project's visual base from the lead hero reference image
//! and phrases every downstream prompt consistently with the detected
//! category. Without this, photoreal projects drift into anime frames (and
//! vice versa) as soon as a scene description mentions stylized elements.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

// =============================================================================
// Style category
// =============================================================================

/// Coarse visual category of the production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StyleCategory {
    /// Live action / photographic.
    #[serde(rename = "REAL")]
    Real,
    /// 2D anime / flat illustration.
    #[serde(rename = "2D")]
    TwoD,
    /// 3D CGI / game render.
    #[serde(rename = "3D")]
    ThreeD,
    /// Not yet analyzed.
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl StyleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleCategory::Real => "REAL",
            StyleCategory::TwoD => "2D",
            StyleCategory::ThreeD => "3D",
            StyleCategory::Unknown => "UNKNOWN",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.to_uppercase().as_str() {
            "REAL" => Some(StyleCategory::Real),
            "2D" => Some(StyleCategory::TwoD),
            "3D" => Some(StyleCategory::ThreeD),
            _ => None,
        }
    }

    /// Hard style keywords prepended to every shot image prompt.
    pub fn image_prefix(&self) -> &'static str {
        match self {
            StyleCategory::Real => "PHOTOREALISTIC, 8k, RAW photo, real life, cinematic lighting. ",
            StyleCategory::TwoD => {
                "2D ANIME STYLE, flat illustration, cel shaded, hand drawn, 2d animation. "
            }
            StyleCategory::ThreeD => "3D RENDER, Unreal Engine 5, Octane Render, CGI, 3d character. ",
            StyleCategory::Unknown => "",
        }
    }

    /// Negative prompt for shot images: the base exclusions plus the
    /// competing categories.
    pub fn negative_prompt(&self) -> String {
        let mut negative = String::from("text, watermark, bad anatomy, blur");
        match self {
            StyleCategory::Real => negative.push_str(
                ", anime, cartoon, illustration, drawing, 3d render, cgi, sketch, painting",
            ),
            StyleCategory::TwoD => negative.push_str(
                ", photorealistic, real photo, 3d render, cgi, unity, unreal engine, photograph",
            ),
            StyleCategory::ThreeD => negative.push_str(
                ", 2d, flat illustration, sketch, drawing, anime, japanese anime, photograph, real person",
            ),
            StyleCategory::Unknown => {}
        }
        negative
    }

    /// Style prefix for character and location anchor sheets.
    pub fn anchor_prefix(&self) -> &'static str {
        match self {
            StyleCategory::Real => "Real photo, photorealistic, 8k. ",
            StyleCategory::TwoD => "2D Anime character sheet, flat color, cel shaded. ",
            StyleCategory::ThreeD => "3D Render character sheet, cgi, unreal engine 5. ",
            StyleCategory::Unknown => "",
        }
    }

    /// Constraint paragraph injected into script planning prompts.
    pub fn script_constraint(&self) -> &'static str {
        match self {
            StyleCategory::Real => {
                "CONSTRAINT: The film features REAL ACTORS. All scene descriptions, costumes, and settings MUST be described as 'Real World', 'Photorealistic', 'Cinematic Photography'. Avoid cartoon/anime terms."
            }
            StyleCategory::TwoD => {
                "CONSTRAINT: The film is a 2D ANIME/ANIMATION. All scene descriptions MUST emphasize '2D Anime Style', 'Flat Illustration', 'Cel Shading', 'Hand Drawn'. Avoid realistic terms."
            }
            StyleCategory::ThreeD => {
                "CONSTRAINT: The film is a 3D CGI/GAME ANIMATION. All scene descriptions MUST emphasize '3D Render', 'Unreal Engine 5', 'Volumetric Lighting', 'CGI'."
            }
            StyleCategory::Unknown => "",
        }
    }

    /// Short constraint line for bridging shot/scene prompts.
    pub fn bridging_constraint(&self) -> &'static str {
        match self {
            StyleCategory::Real => "Ensure visual descriptions imply Real World photography.",
            StyleCategory::TwoD => "Ensure visual descriptions imply 2D Anime/Animation.",
            StyleCategory::ThreeD => "Ensure visual descriptions imply 3D CGI/Game graphics.",
            StyleCategory::Unknown => "",
        }
    }
}

impl std::fmt::Display for StyleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Continuity state
// =============================================================================

/// Prompt sent with the lead hero image to classify the visual base.
pub const STYLE_ANALYSIS_PROMPT: &str = r#"Analyze the ART STYLE of this character image.

STEP 1: Classify into one of these 3 STRICT CATEGORIES:
- "REAL" (if it looks like a real human photo, photorealistic, cinematic)
- "2D" (if it looks like 2D anime, cartoon, flat illustration, drawing)
- "3D" (if it looks like 3D CGI, Pixar, Game Render, Clay, 3D model)

STEP 2: Generate 5-10 precise keywords describing the style.

Return JSON ONLY: { "category": "REAL" | "2D" | "3D", "keywords": "string" }"#;

/// Detected visual style, computed once per launch and threaded through
/// all prompt assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityState {
    pub category: StyleCategory,
    /// Style keywords from the analysis; empty when analysis failed or no
    /// hero reference exists.
    pub keywords: String,
}

impl ContinuityState {
    /// Parses a style analysis response.
    ///
    /// Malformed JSON or an unrecognized category resolves to `Real`
    /// rather than failing; a wrong but consistent style beats aborting
    /// the launch.
    pub fn from_analysis_json(text: &str) -> Self {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("style analysis response was not JSON: {}", e);
                return Self {
                    category: StyleCategory::Real,
                    keywords: String::new(),
                };
            }
        };

        let category = value
            .get("category")
            .and_then(Value::as_str)
            .and_then(StyleCategory::from_label)
            .unwrap_or(StyleCategory::Real);

        let keywords = value
            .get("keywords")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self { category, keywords }
    }

    /// Fallback state when analysis cannot run at all.
    pub fn assumed_real() -> Self {
        Self {
            category: StyleCategory::Real,
            keywords: String::new(),
        }
    }

    pub fn has_detected_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }

    /// Visual base line for shot image prompts. Detected keywords are
    /// repeated under a STRICT STYLE ENFORCEMENT header; without them the
    /// genre-derived instruction stands alone.
    pub fn visual_base(&self, genre: &str) -> String {
        if self.has_detected_keywords() {
            format!(
                "STRICT STYLE ENFORCEMENT: {}. {}",
                self.keywords, self.keywords
            )
        } else {
            visual_base_instruction(genre).to_string()
        }
    }

    /// Visual style descriptor for bridging prompts: detected keywords,
    /// else the genre name itself.
    pub fn bridging_style<'a>(&'a self, genre: &'a str) -> &'a str {
        if self.has_detected_keywords() {
            &self.keywords
        } else {
            genre
        }
    }
}

/// Genre-derived visual base used before any style has been detected.
pub fn visual_base_instruction(genre: &str) -> &'static str {
    if genre.contains("Anime")
        || genre.contains("动漫")
        || genre.contains("Pixel")
        || genre.contains("二次元")
    {
        return "2D Anime, Cel Shaded, Flat illustration, high quality line art.";
    }
    if genre.contains("Illustration") || genre.contains("绘本") {
        return "Hand drawn illustration, artistic texture.";
    }
    if genre.contains("3D") || genre.contains("Game") || genre.contains("AAA") {
        return "Unreal Engine 5 Render, 3D CGI, Octane Render, 8k, detailed textures.";
    }
    "Photorealistic, 8k, Live Action, Cinematography, high fidelity, 35mm film grain."
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analysis_response() {
        let state = ContinuityState::from_analysis_json(
            r#"{"category": "2D", "keywords": "cel shaded, pastel palette"}"#,
        );
        assert_eq!(state.category, StyleCategory::TwoD);
        assert_eq!(state.keywords, "cel shaded, pastel palette");
    }

    #[test]
    fn test_parse_lowercase_category() {
        let state = ContinuityState::from_analysis_json(r#"{"category": "real", "keywords": "k"}"#);
        assert_eq!(state.category, StyleCategory::Real);
    }

    #[test]
    fn test_unrecognized_category_falls_back_to_real() {
        let state =
            ContinuityState::from_analysis_json(r#"{"category": "VOXEL", "keywords": "cubes"}"#);
        assert_eq!(state.category, StyleCategory::Real);
        assert_eq!(state.keywords, "cubes");
    }

    #[test]
    fn test_malformed_json_falls_back_to_real() {
        let state = ContinuityState::from_analysis_json("the model rambled instead");
        assert_eq!(state.category, StyleCategory::Real);
        assert!(state.keywords.is_empty());
    }

    #[test]
    fn test_visual_base_doubles_detected_keywords() {
        let state = ContinuityState {
            category: StyleCategory::TwoD,
            keywords: "cel shaded".to_string(),
        };
        assert_eq!(
            state.visual_base("Anime"),
            "STRICT STYLE ENFORCEMENT: cel shaded. cel shaded"
        );
    }

    #[test]
    fn test_visual_base_without_keywords_uses_genre() {
        let state = ContinuityState::assumed_real();
        assert_eq!(
            state.visual_base("动漫 (Anime)"),
            "2D Anime, Cel Shaded, Flat illustration, high quality line art."
        );
        assert_eq!(
            state.visual_base("Film Noir"),
            "Photorealistic, 8k, Live Action, Cinematography, high fidelity, 35mm film grain."
        );
    }

    #[test]
    fn test_visual_base_instruction_branches() {
        assert!(visual_base_instruction("3D Game").contains("Unreal Engine 5"));
        assert!(visual_base_instruction("绘本 Storybook").contains("Hand drawn"));
        assert!(visual_base_instruction("Short Drama").contains("Photorealistic"));
    }

    #[test]
    fn test_negative_prompt_excludes_competing_categories() {
        let real = StyleCategory::Real.negative_prompt();
        assert!(real.starts_with("text, watermark, bad anatomy, blur"));
        assert!(real.contains("anime"));

        let two_d = StyleCategory::TwoD.negative_prompt();
        assert!(two_d.contains("photorealistic"));

        let unknown = StyleCategory::Unknown.negative_prompt();
        assert_eq!(unknown, "text, watermark, bad anatomy, blur");
    }

    #[test]
    fn test_unknown_category_has_no_prefixes() {
        assert_eq!(StyleCategory::Unknown.image_prefix(), "");
        assert_eq!(StyleCategory::Unknown.anchor_prefix(), "");
        assert_eq!(StyleCategory::Unknown.script_constraint(), "");
    }

    #[test]
    fn test_category_wire_form() {
        let json = serde_json::to_string(&StyleCategory::TwoD).ok();
        assert_eq!(json.as_deref(), Some(r#""2D""#));

        let parsed: StyleCategory = serde_json::from_str(r#""REAL""#).unwrap();
        assert_eq!(parsed, StyleCategory::Real);
    }
}
