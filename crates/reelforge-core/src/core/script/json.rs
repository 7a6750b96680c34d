//! Tolerant JSON extraction for model replies.
//!
//! Models asked for JSON still wrap it in markdown fences or chatty prose.
//! Extraction strips fences and slices the outermost object before parsing.

use serde::de::DeserializeOwned;

use crate::core::{CoreError, CoreResult};

/// Pulls the outermost JSON object out of a model reply and deserializes it.
///
/// Fenced blocks (```` ```json ````) are stripped, then everything outside the
/// first `{` and last `}` is discarded. An empty reply parses as `{}` so
/// payload structs fall back to their serde defaults.
pub fn extract_json_object<T: DeserializeOwned>(text: &str) -> CoreResult<T> {
    let without_fences = text.replace("```json", "").replace("```", "");
    let mut clean = without_fences.as_str();

    if let (Some(first), Some(last)) = (clean.find('{'), clean.rfind('}')) {
        if last > first {
            clean = &clean[first..=last];
        }
    }
    if clean.trim().is_empty() {
        clean = "{}";
    }

    serde_json::from_str(clean).map_err(|e| CoreError::ResponseParseFailed(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Payload {
        #[serde(default)]
        title: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_extract_plain_object() {
        let parsed: Payload = extract_json_object(r#"{"title": "Dawn", "count": 3}"#).unwrap();
        assert_eq!(parsed.title, "Dawn");
        assert_eq!(parsed.count, 3);
    }

    #[test]
    fn test_extract_fenced_object() {
        let reply = "```json\n{\"title\": \"Dusk\", \"count\": 7}\n```";
        let parsed: Payload = extract_json_object(reply).unwrap();
        assert_eq!(parsed.title, "Dusk");
        assert_eq!(parsed.count, 7);
    }

    #[test]
    fn test_extract_prose_wrapped_object() {
        let reply = "Sure! Here is the plan you asked for:\n{\"title\": \"Noon\"}\nLet me know if you need edits.";
        let parsed: Payload = extract_json_object(reply).unwrap();
        assert_eq!(parsed.title, "Noon");
        assert_eq!(parsed.count, 0);
    }

    #[test]
    fn test_extract_braceless_reply_fails() {
        let err = extract_json_object::<Payload>("I cannot produce that plan.").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse AI response:"));
    }

    #[test]
    fn test_extract_empty_reply_uses_defaults() {
        let parsed: Payload = extract_json_object("").unwrap();
        assert_eq!(parsed, Payload::default());
    }

    #[test]
    fn test_extract_trailing_garbage_dropped() {
        let reply = "```json\n{\"title\": \"Arc\", \"count\": 2} trailing {garbage";
        // The slice runs to the last closing brace, so an unterminated
        // trailing fragment is discarded.
        let parsed: Payload = extract_json_object(reply).unwrap();
        assert_eq!(parsed.title, "Arc");
    }
}
