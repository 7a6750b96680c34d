//! Failure Classification
//!
//! Maps arbitrary failure messages from the relay onto a small taxonomy that
//! drives recovery: daily quota exhaustion and rejected credentials require a
//! new API key before any further generation call, auth failures point at the
//! relay itself, and everything else surfaces as a truncated generic alert.

use serde::{Deserialize, Serialize};

/// Maximum length of a user-facing message derived from an unclassified
/// failure.
const USER_MESSAGE_LIMIT: usize = 150;

/// Recovery class of a failed generation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The key's daily request budget is spent. Comes back tomorrow; the only
    /// fix now is switching to a different key.
    DailyQuota,
    /// The provider rejected the credential itself (invalid key, billing
    /// required, hard rate cap). A replacement key is required.
    CredentialRejected,
    /// The relay refused the request before it reached a model (401/403).
    AuthError,
    /// Anything else. Shown truncated, never interrupts with a key prompt.
    Unknown,
}

impl FailureKind {
    /// Classifies a failure message.
    ///
    /// Matching is on the lowercased text. Branch order mirrors the recovery
    /// flow: hard credential caps first, then the daily quota, then the
    /// remaining credential signatures, then relay auth.
    pub fn from_message(message: &str) -> Self {
        let msg = message.to_lowercase();

        if msg.contains("limit: 0") || (msg.contains("429") && msg.contains("resource_exhausted"))
        {
            return FailureKind::CredentialRejected;
        }
        if msg.contains("per_day") {
            return FailureKind::DailyQuota;
        }
        if msg.contains("requested entity was not found")
            || msg.contains("api_key_invalid")
            || msg.contains("billing")
        {
            return FailureKind::CredentialRejected;
        }
        if msg.contains("proxy auth error") || msg.contains("401") {
            return FailureKind::AuthError;
        }
        FailureKind::Unknown
    }

    /// A critical failure invalidates the current credential: generation must
    /// not continue until the caller supplies a new key. Critical failures
    /// are never retried.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            FailureKind::DailyQuota | FailureKind::CredentialRejected
        )
    }
}

/// Flattens any failure message to the short form suitable for an alert.
pub fn user_facing_message(message: &str) -> String {
    let msg = if message.is_empty() { "Unknown" } else { message };
    match msg.char_indices().nth(USER_MESSAGE_LIMIT) {
        Some((byte_idx, _)) => msg[..byte_idx].to_string(),
        None => msg.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
