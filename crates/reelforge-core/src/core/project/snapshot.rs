//! Project snapshots
//!
//! Versioned on-disk form of a [`Project`]. Written atomically so a crash
//! mid-save never corrupts the previous snapshot. Video bytes are not part
//! of the snapshot; clips are re-fetched or re-rendered after a load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AssetLibrary, AudioTrack, Project, ProjectSettings, Scene};
use crate::core::continuity::ContinuityState;
use crate::core::{fs, AspectRatio, CoreError, CoreResult};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Settings as persisted: the three style descriptors collapse into one
/// `" | "`-joined label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    pub genre: String,
    pub style: String,
    #[serde(default)]
    pub custom_style: String,
    pub language: String,
    pub page_count: u32,
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub premise: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotContent {
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub audio_track: Option<AudioTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub version: u32,
    /// RFC3339 save time.
    pub timestamp: String,
    pub settings: SnapshotSettings,
    #[serde(default)]
    pub assets: AssetLibrary,
    #[serde(default)]
    pub content: SnapshotContent,
    #[serde(default)]
    pub continuity: ContinuityState,
    #[serde(default)]
    pub masterpiece_ref: Option<String>,
}

impl ProjectSnapshot {
    pub fn from_project(project: &Project) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now().to_rfc3339(),
            settings: SnapshotSettings {
                genre: project.settings.genre.clone(),
                style: project.settings.composite_style(),
                custom_style: project.settings.custom_style.clone(),
                language: project.settings.language.clone(),
                page_count: project.settings.page_count,
                aspect_ratio: project.settings.aspect_ratio,
                premise: project.settings.premise.clone(),
            },
            assets: project.assets.clone(),
            content: SnapshotContent {
                scenes: project.scenes.clone(),
                audio_track: project.audio.clone(),
            },
            continuity: project.continuity.clone(),
            masterpiece_ref: project.masterpiece_ref.clone(),
        }
    }

    /// Rebuilds the in-memory project. Fails on a schema version this build
    /// does not understand.
    pub fn into_project(self) -> CoreResult<Project> {
        if self.version != SNAPSHOT_VERSION {
            return Err(CoreError::ProjectCorrupted(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }

        let mut settings = ProjectSettings {
            genre: self.settings.genre,
            custom_style: self.settings.custom_style,
            language: self.settings.language,
            page_count: self.settings.page_count,
            aspect_ratio: self.settings.aspect_ratio,
            premise: self.settings.premise,
            ..ProjectSettings::default()
        };
        settings.apply_style_label(&self.settings.style);

        Ok(Project {
            settings,
            assets: self.assets,
            scenes: self.content.scenes,
            continuity: self.continuity,
            audio: self.content.audio_track,
            masterpiece_ref: self.masterpiece_ref,
        })
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        fs::atomic_write_json_pretty(path, self)
            .map_err(|e| CoreError::ProjectSaveFailed(e.to_string()))
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::ProjectNotFound(path.display().to_string())
            } else {
                CoreError::IoError(e)
            }
        })?;
        serde_json::from_str(&text).map_err(|e| CoreError::ProjectCorrupted(e.to_string()))
    }
}

/// Saves a project snapshot to `path`.
pub fn save_project(project: &Project, path: &Path) -> CoreResult<()> {
    ProjectSnapshot::from_project(project).save(path)
}

/// Loads a project from a snapshot at `path`.
pub fn load_project(path: &Path) -> CoreResult<Project> {
    ProjectSnapshot::load(path)?.into_project()
}
