//! ReelForge Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{CoreError, CoreResult};

// =============================================================================
// ID Types
// =============================================================================

/// Scene unique identifier
pub type SceneId = String;

/// Shot unique identifier
pub type ShotId = String;

/// Reference asset unique identifier
pub type AssetId = String;

/// Remote generation job identifier (assigned by the relay)
pub type JobId = String;

// =============================================================================
// Aspect Ratio
// =============================================================================

/// Frame aspect ratio for generated imagery and video.
///
/// Serialized in the wire form used by the relay ("1:1", "16:9", "9:16").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Vertical,
}

impl AspectRatio {
    /// Wire form of the ratio.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Vertical => "9:16",
        }
    }

    /// Pixel size string the image endpoint expects for this ratio.
    pub fn image_size(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1024x1024",
            AspectRatio::Widescreen => "1024x576",
            AspectRatio::Vertical => "576x1024",
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Widescreen
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Image Data
// =============================================================================

/// In-memory image payload.
///
/// Persisted and exchanged as a base64 data URL
/// (`data:<mime>;base64,<payload>`), matching the project file format and
/// the relay's `image_url` content parts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ImageData {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Decodes a data URL. A bare base64 payload without the `data:` prefix
    /// is accepted and assumed to be a PNG.
    pub fn from_data_url(url: &str) -> CoreResult<Self> {
        let (mime, payload) = match url.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    CoreError::ValidationError("data URL has no payload".to_string())
                })?;
                let mime = header.strip_suffix(";base64").unwrap_or(header);
                let mime = if mime.is_empty() { "image/png" } else { mime };
                (mime.to_string(), payload)
            }
            None => ("image/png".to_string(), url),
        };
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| CoreError::ValidationError(format!("invalid base64 image: {e}")))?;
        Ok(Self { mime, bytes })
    }

    /// Encodes as `data:<mime>;base64,<payload>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }

    /// Raw base64 payload without the data URL prefix.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

impl From<ImageData> for String {
    fn from(img: ImageData) -> Self {
        img.to_data_url()
    }
}

impl TryFrom<String> for ImageData {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ImageData::from_data_url(&value)
    }
}

// Keeps megabytes of pixel data out of log lines.
impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime", &self.mime)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

// =============================================================================
// Languages
// =============================================================================

/// Dialogue language options offered at setup, as `(code, label)` pairs.
pub const DIALOGUE_LANGUAGES: &[(&str, &str)] = &[
    ("zh-CN", "简体中文 (CN)"),
    ("en-US", "English (US)"),
    ("ja-JP", "日本語 (JP)"),
    ("ko-KR", "한국어 (KR)"),
];

/// Lyric language options for music generation.
pub const LYRIC_LANGUAGES: &[(&str, &str)] = &[
    ("zh", "中文 (Chinese)"),
    ("en", "English"),
    ("ja", "日本語 (Japanese)"),
    ("ko", "한국어 (Korean)"),
    ("es", "Español"),
    ("fr", "Français"),
    ("de", "Deutsch"),
];

/// Resolves a dialogue language code to the name used inside prompts.
///
/// Chinese variants are always spelled out in full so the planner does not
/// fall back to English for zh locales it does not recognize.
pub fn language_prompt_name(code: &str) -> String {
    if code.contains("zh") || code.contains("CN") {
        return "Simplified Chinese (简体中文)".to_string();
    }
    DIALOGUE_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Resolves a lyric language code to its display name, falling back to the
/// code itself.
pub fn lyric_language_name(code: &str) -> String {
    LYRIC_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| code.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_wire_form() {
        assert_eq!(AspectRatio::Square.as_str(), "1:1");
        assert_eq!(AspectRatio::Widescreen.as_str(), "16:9");
        assert_eq!(AspectRatio::Vertical.as_str(), "9:16");

        let json = serde_json::to_string(&AspectRatio::Widescreen).unwrap();
        assert_eq!(json, "\"16:9\"");
        let back: AspectRatio = serde_json::from_str("\"9:16\"").unwrap();
        assert_eq!(back, AspectRatio::Vertical);
    }

    #[test]
    fn test_aspect_ratio_image_size() {
        assert_eq!(AspectRatio::Square.image_size(), "1024x1024");
        assert_eq!(AspectRatio::Widescreen.image_size(), "1024x576");
        assert_eq!(AspectRatio::Vertical.image_size(), "576x1024");
    }

    #[test]
    fn test_image_data_round_trip() {
        let img = ImageData::new("image/png", vec![1, 2, 3, 4]);
        let url = img.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let back = ImageData::from_data_url(&url).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_image_data_accepts_bare_base64() {
        let raw = BASE64.encode([9u8, 8, 7]);
        let img = ImageData::from_data_url(&raw).unwrap();
        assert_eq!(img.mime, "image/png");
        assert_eq!(img.bytes, vec![9, 8, 7]);
    }

    #[test]
    fn test_image_data_rejects_garbage() {
        assert!(ImageData::from_data_url("data:image/png;base64,@@@").is_err());
        assert!(ImageData::from_data_url("data:image/png;base64").is_err());
    }

    #[test]
    fn test_image_data_serde_as_string() {
        let img = ImageData::new("image/jpeg", vec![0xFF, 0xD8]);
        let json = serde_json::to_string(&img).unwrap();
        assert!(json.starts_with("\"data:image/jpeg;base64,"));
        let back: ImageData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_language_prompt_name() {
        assert_eq!(
            language_prompt_name("zh-CN"),
            "Simplified Chinese (简体中文)"
        );
        assert_eq!(language_prompt_name("en-US"), "English (US)");
        // Unknown codes pass through unchanged.
        assert_eq!(language_prompt_name("fr-FR"), "fr-FR");
    }

    #[test]
    fn test_lyric_language_name() {
        assert_eq!(lyric_language_name("ja"), "日本語 (Japanese)");
        assert_eq!(lyric_language_name("it"), "it");
    }
}
