//! Director personas.
//!
//! Each genre category gets a distinct authorial voice for the planning
//! prompt. A K-pop dance performance reads very differently when planned by a
//! music video director than by a screenwriter, so the persona steers role,
//! focus, and act structure before any project specifics are appended.

use crate::core::project::catalog::genre_category;

/// The authorial voice injected at the top of the script planning prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectorPersona {
    /// Who the model should write as.
    pub role: &'static str,
    /// One-line description of the deliverable.
    pub task_desc: &'static str,
    /// What this persona cares about above all else.
    pub focus: &'static str,
    /// The act structure the script should follow.
    pub structure_guide: &'static str,
    /// Register and pacing guidance for the output itself.
    pub output_advice: &'static str,
}

const MV_PERSONA: DirectorPersona = DirectorPersona {
    role: "Master Music Video Director & Choreographer (like Michel Gondry, Dave Meyers, or Spike Jonze).",
    task_desc: "Create a visually driven Music Video treatment.",
    focus: "Visual rhythm, beat synchronization, choreography, lighting, and mood. MINIMAL DIALOGUE.",
    structure_guide: "Structure: Intro (Mood Setter) -> Verse 1 (Narrative/Performance) -> Chorus (High Energy/Dance) -> Bridge (Visual Shift) -> Outro (Fade).",
    output_advice: "Focus on visual flow and editing beats. Dialogue should be lyrics or silence. Describe camera movement matching the music tempo.",
};

const ADS_PERSONA: DirectorPersona = DirectorPersona {
    role: "Cannes Lions Award-winning Creative Director (Ogilvy/Leo Burnett style).",
    task_desc: "Create a high-impact Commercial / Ad Spot.",
    focus: "Brand impact, product showcase, consumer insight, and visual persuasion.",
    structure_guide: "Structure: The Hook (0-3s, Attention Grabber) -> The Pain/Need -> The Solution (Product) -> The Benefit (Euphoria) -> Call to Action.",
    output_advice: "Dialogue must be punchy slogans or sharp copy. Visuals should be high-end commercial quality. Pacing is extremely fast.",
};

const SHORT_DRAMA_PERSONA: DirectorPersona = DirectorPersona {
    role: "Viral Short Video Scriptwriter (TikTok/Reels/Douyin Expert).",
    task_desc: "Create a viral Vertical Drama script.",
    focus: "High retention, immediate hooks, emotional reversals, and 'face-slapping' moments.",
    structure_guide: "Structure: 3-second Hook -> Intense Conflict Setup -> Escalation -> Immediate Reversal/Climax -> Cliffhanger.",
    output_advice: "Pacing must be breathless. Dialogue is sharp, conflict-driven, and emotional. Every scene must end with a hook.",
};

const ANIME_PERSONA: DirectorPersona = DirectorPersona {
    role: "Veteran Anime Series Director & Composition Writer.",
    task_desc: "Create an Anime Episode storyboard.",
    focus: "Character expression (sakuga moments), world-building, and emotional resonance.",
    structure_guide: "Structure: Introduction (Setup) -> Inciting Incident -> Rising Action (Battle/Drama) -> Climax (Sakuga) -> Resolution.",
    output_advice: "Include internal monologues. Visuals should describe exaggerated expressions, speed lines, and anime tropes.",
};

const FILM_PERSONA: DirectorPersona = DirectorPersona {
    role: "Master Screenwriter and Film Theorist (like Robert McKee or Syd Field).",
    task_desc: "Create a Cinematic Film Narrative.",
    focus: "Cinematic storytelling, character arc, visual subtext, and thematic depth.",
    structure_guide: "Structure: Act 1 (The Status Quo & Inciting Incident) -> Act 2 (Progressive Complications) -> Act 3 (The Crisis & Climax) -> Resolution.",
    output_advice: "Focus on subtext and cinematic visual language. Show, don't tell.",
};

/// Resolves the persona for a genre via its catalog category, with a
/// substring fallback so free-typed genres like "Cyberpunk MV" still land on
/// the right voice. Unmatched genres plan as cinema.
pub fn persona_for_genre(genre: &str) -> DirectorPersona {
    let category = genre_category(genre);
    if category.contains("MV") || genre.contains("MV") {
        MV_PERSONA
    } else if category.contains("Ads") || genre.contains("广告") {
        ADS_PERSONA
    } else if category.contains("Short Drama") || genre.contains("短剧") {
        SHORT_DRAMA_PERSONA
    } else if category.contains("Anime") || genre.contains("动漫") {
        ANIME_PERSONA
    } else {
        FILM_PERSONA
    }
}

// =============================================================================
// Tests
// =============================================================================
