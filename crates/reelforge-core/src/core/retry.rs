//! Retry/Resilience Layer
//!
//! Wraps any asynchronous gateway call with bounded exponential backoff.
//! Transient overload is absorbed up to the retry budget; critical failures
//! (dead credentials, daily quota) and non-retryable errors propagate
//! immediately without consuming an attempt.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::sleep;
use tracing::warn;

use super::classify::FailureKind;
use super::{CoreError, CoreResult};

/// Message fragments that mark a failure as transient overload.
///
/// Matched case-sensitively against the raw failure text. The uppercase
/// entries are provider status codes, the capitalized ones are the wrapped
/// HTTP errors produced by the relay gateway.
const RETRYABLE_FRAGMENTS: &[&str] = &[
    "503",
    "429",
    "RESOURCE_EXHAUSTED",
    "Failed to fetch",
    "500",
    "Internal Server Error",
    "INTERNAL",
    "Server Busy",
];

fn hint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"retry in ([\d.]+)s").unwrap())
}

/// Bounded backoff policy for gateway calls.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = retries + 1).
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each hint-less retry.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 4000,
            backoff_factor: 1.5,
        }
    }
}

impl RetryPolicy {
    /// Policy with a custom retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Policy with a custom initial delay (tests use near-zero values).
    pub fn with_initial_delay_ms(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    /// Executes `operation`, retrying transient failures with exponential
    /// backoff.
    ///
    /// When the failure text carries a provider "retry in Ns" hint, the next
    /// wait is `ceil(N*1000)+1000` ms and backoff multiplication resumes from
    /// that value instead of the computed delay.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let mut delay_ms = self.initial_delay_ms;
        let mut last_error: Option<CoreError> = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let message = err.to_message();
                    if FailureKind::from_message(&message).is_critical() {
                        return Err(err);
                    }
                    if !is_retryable_message(&message) {
                        return Err(err);
                    }
                    last_error = Some(err);
                    if attempt < self.max_retries {
                        let hint = retry_hint_ms(&message);
                        let wait_ms = hint.unwrap_or(delay_ms);
                        warn!(
                            attempt = attempt + 1,
                            wait_ms, "transient gateway failure: {message}"
                        );
                        sleep(Duration::from_millis(wait_ms)).await;
                        delay_ms = match hint {
                            Some(hinted) => hinted,
                            None => (delay_ms as f64 * self.backoff_factor) as u64,
                        };
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CoreError::Internal("retry loop exhausted without error".into())))
    }
}

/// True when the failure text marks transient overload worth retrying.
pub fn is_retryable_message(message: &str) -> bool {
    RETRYABLE_FRAGMENTS.iter().any(|frag| message.contains(frag))
}

/// Extracts a provider-suggested wait from "retry in Ns" text, padded by one
/// second to land safely after the window reopens.
pub fn retry_hint_ms(message: &str) -> Option<u64> {
    let caps = hint_regex().captures(message)?;
    let secs: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some((secs * 1000.0).ceil() as u64 + 1000)
}

// =============================================================================
// Tests
// =============================================================================
