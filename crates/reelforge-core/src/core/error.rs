//! ReelForge Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::{AssetId, SceneId, ShotId};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Project Errors
    // =========================================================================
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Project file corrupted: {0}")]
    ProjectCorrupted(String),

    #[error("Failed to save project: {0}")]
    ProjectSaveFailed(String),

    // =========================================================================
    // Cast and Scene Errors
    // =========================================================================
    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("Scene not found: {0}")]
    SceneNotFound(SceneId),

    #[error("Shot not found: {0}")]
    ShotNotFound(ShotId),

    #[error("No hero in the cast: at least one hero reference is required")]
    NoHeroes,

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    #[error("Gateway request failed: {0}")]
    GatewayRequestFailed(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to parse AI response: {0}")]
    ResponseParseFailed(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    // =========================================================================
    // Production Errors
    // =========================================================================
    #[error("Script generation failed: the planner returned no scenes")]
    ScriptEmpty,

    #[error("Invalid start image for video generation")]
    MissingStartFrame,

    #[error("Video generation timed out")]
    VideoTimeout,

    #[error("Music generation failed: {0}")]
    MusicFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Flatten to the message text used by failure classification.
    pub fn to_message(&self) -> String {
        self.to_string()
    }
}
