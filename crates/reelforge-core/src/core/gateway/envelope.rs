//! Response Envelope
//!
//! Normalized view over heterogeneous relay response payloads. The relay
//! fronts several upstream providers and the field carrying a given fact
//! (job id, result URL, status) varies between them and across versions.
//! Extraction is an ordered first-match-wins walk over dotted paths, and it
//! is isolated here so the rest of the core never inspects raw payload
//! shapes.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Candidate fields for a provider-assigned job identifier, most common
/// first. Only non-empty strings count; numeric ids are not coerced.
pub const JOB_ID_FIELDS: &[&str] = &[
    "task_id",
    "taskId",
    "job_id",
    "operation_id",
    "id",
    "request_id",
    "uuid",
    "result.id",
    "data.id",
    "data.task_id",
    "ids.0",
    "task.id",
    "operation.id",
];

/// Candidate fields for a result media URL on a submission response.
pub const SUBMIT_URL_FIELDS: &[&str] =
    &["result_url", "video_url", "uri", "result.url", "output_url"];

/// Candidate fields for a result media URL on a poll response.
pub const POLL_URL_FIELDS: &[&str] = &["data.output", "result_url", "video_url", "uri"];

fn location_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"generations/?([A-Za-z0-9_-]+)").unwrap())
}

/// A relay response payload with tolerant field access.
#[derive(Clone, Debug)]
pub struct ResponseEnvelope {
    payload: Value,
}

impl ResponseEnvelope {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Parses a raw response body. Invalid JSON yields an empty envelope
    /// rather than an error; extraction then simply finds nothing.
    pub fn from_body(body: &str) -> Self {
        Self {
            payload: serde_json::from_str(body).unwrap_or(Value::Null),
        }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// When the payload is an array, an envelope over its first element.
    /// Some relay endpoints wrap a single record in a one-element array.
    pub fn first_element(&self) -> ResponseEnvelope {
        match &self.payload {
            Value::Array(items) => ResponseEnvelope {
                payload: items.first().cloned().unwrap_or(Value::Null),
            },
            _ => self.clone(),
        }
    }

    /// Dotted-path lookup. Numeric segments index into arrays; on objects
    /// they behave as ordinary keys.
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        let mut current = &self.payload;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => {
                    let idx: usize = segment.parse().ok()?;
                    items.get(idx)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Non-empty string at `path`.
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.value_at(path)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// First non-empty string among `paths`, in order.
    pub fn first_text(&self, paths: &[&str]) -> Option<&str> {
        paths.iter().find_map(|path| self.text_at(path))
    }

    /// Provider-assigned job identifier, if any.
    ///
    /// Walks the candidate field table; when nothing matches, falls back to
    /// pattern-matching an id out of a `location` URL.
    pub fn job_id(&self) -> Option<String> {
        if let Some(id) = self.first_text(JOB_ID_FIELDS) {
            return Some(id.to_string());
        }
        let location = self.text_at("location")?;
        location_id_regex()
            .captures(location)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// The `status` field, when present.
    pub fn status(&self) -> Option<&str> {
        self.text_at("status")
    }
}

// =============================================================================
// Tests
// =============================================================================
