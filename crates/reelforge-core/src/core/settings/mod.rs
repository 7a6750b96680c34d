//! Settings Persistence System
//!
//! Provides persistent studio settings with:
//! - Atomic file writes (temp file + rename)
//! - Schema validation with defaults
//! - Advisory file locking against concurrent writers
//!
//! Storage location: {data_dir}/settings.json

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::gateway::{RelayGateway, DEFAULT_BASE_URL, DEFAULT_VIDEO_MODEL, VIDEO_MODELS};
use crate::core::retry::RetryPolicy;
use crate::core::{fs as corefs, CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

/// Studio settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudioSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Relay gateway credentials and endpoints
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Generation pacing
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Retry budget for gateway calls
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            gateway: GatewaySettings::default(),
            generation: GenerationSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl StudioSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    ///
    /// This is intentionally tolerant: it corrects bad values instead of
    /// failing, so corrupted/old configs don't brick the studio.
    ///
    /// This method is public for testing purposes.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;
        self.gateway.normalize();
        self.generation.normalize();
        self.retry.normalize();
    }
}

/// Relay gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    /// Shared bearer key used for any lane without a dedicated override
    #[serde(default)]
    pub api_key: Option<String>,

    /// Text/chat lane override
    #[serde(default)]
    pub text_key: Option<String>,

    /// Image lane override
    #[serde(default)]
    pub image_key: Option<String>,

    /// Video lane override
    #[serde(default)]
    pub video_key: Option<String>,

    /// Relay base URL for text/image/video
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Relay base URL for music endpoints
    #[serde(default = "default_base_url")]
    pub music_base_url: String,

    /// Video model identifier
    #[serde(default = "default_video_model")]
    pub video_model: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            text_key: None,
            image_key: None,
            video_key: None,
            base_url: default_base_url(),
            music_base_url: default_base_url(),
            video_model: default_video_model(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_video_model() -> String {
    DEFAULT_VIDEO_MODEL.to_string()
}

impl GatewaySettings {
    pub fn normalize(&mut self) {
        normalize_key(&mut self.api_key);
        normalize_key(&mut self.text_key);
        normalize_key(&mut self.image_key);
        normalize_key(&mut self.video_key);

        self.base_url = normalize_url(&self.base_url);
        self.music_base_url = normalize_url(&self.music_base_url);

        if !VIDEO_MODELS.iter().any(|(value, _)| *value == self.video_model) {
            self.video_model = default_video_model();
        }
    }

    /// Key for the text/chat lane (music rides this one too).
    pub fn resolved_text_key(&self) -> Option<&str> {
        self.text_key.as_deref().or(self.api_key.as_deref())
    }

    pub fn resolved_image_key(&self) -> Option<&str> {
        self.image_key.as_deref().or(self.api_key.as_deref())
    }

    pub fn resolved_video_key(&self) -> Option<&str> {
        self.video_key.as_deref().or(self.api_key.as_deref())
    }

    /// True when every lane can authenticate.
    pub fn is_configured(&self) -> bool {
        self.resolved_text_key().is_some()
            && self.resolved_image_key().is_some()
            && self.resolved_video_key().is_some()
    }

    /// Builds the HTTP gateway from these settings.
    pub fn build_gateway(&self) -> CoreResult<RelayGateway> {
        let shared = self
            .api_key
            .clone()
            .or_else(|| self.text_key.clone())
            .or_else(|| self.image_key.clone())
            .or_else(|| self.video_key.clone())
            .ok_or_else(|| {
                CoreError::MissingCredential("no gateway API key configured".to_string())
            })?;

        let mut gateway = RelayGateway::new(shared)?
            .with_base_url(self.base_url.as_str())
            .with_music_base_url(self.music_base_url.as_str());
        if let Some(key) = self.text_key.as_deref() {
            gateway = gateway.with_text_key(key);
        }
        if let Some(key) = self.image_key.as_deref() {
            gateway = gateway.with_image_key(key);
        }
        if let Some(key) = self.video_key.as_deref() {
            gateway = gateway.with_video_key(key);
        }
        Ok(gateway)
    }
}

fn normalize_key(key: &mut Option<String>) {
    if let Some(value) = key {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            *key = None;
        } else if trimmed.len() != value.len() {
            *key = Some(trimmed.to_string());
        }
    }
}

fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        default_base_url()
    } else {
        trimmed.to_string()
    }
}

/// Generation pacing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Shot images issued concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Pause between image batches in milliseconds
    #[serde(default = "default_batch_pause")]
    pub batch_pause_ms: u64,

    /// Video poll interval in milliseconds
    #[serde(default = "default_video_poll_interval")]
    pub video_poll_interval_ms: u64,

    /// Video polls before giving up
    #[serde(default = "default_video_poll_limit")]
    pub video_poll_limit: u32,

    /// Music poll interval in milliseconds
    #[serde(default = "default_music_poll_interval")]
    pub music_poll_interval_ms: u64,

    /// Music polls before giving up
    #[serde(default = "default_music_poll_limit")]
    pub music_poll_limit: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause(),
            video_poll_interval_ms: default_video_poll_interval(),
            video_poll_limit: default_video_poll_limit(),
            music_poll_interval_ms: default_music_poll_interval(),
            music_poll_limit: default_music_poll_limit(),
        }
    }
}

impl GenerationSettings {
    pub fn normalize(&mut self) {
        self.batch_size = self.batch_size.clamp(1, 32);
        self.batch_pause_ms = self.batch_pause_ms.clamp(0, 10_000);
        self.video_poll_interval_ms = self.video_poll_interval_ms.clamp(500, 60_000);
        self.video_poll_limit = self.video_poll_limit.clamp(1, 600);
        self.music_poll_interval_ms = self.music_poll_interval_ms.clamp(500, 60_000);
        self.music_poll_limit = self.music_poll_limit.clamp(1, 600);
    }
}

fn default_batch_size() -> u32 {
    8
}

fn default_batch_pause() -> u64 {
    500
}

fn default_video_poll_interval() -> u64 {
    5000
}

fn default_video_poll_limit() -> u32 {
    60
}

fn default_music_poll_interval() -> u64 {
    5000
}

fn default_music_poll_limit() -> u32 {
    120
}

/// Retry budget settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Backoff multiplier applied per retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetrySettings {
    pub fn normalize(&mut self) {
        self.max_retries = self.max_retries.clamp(0, 10);
        self.initial_delay_ms = self.initial_delay_ms.clamp(100, 60_000);
        if !self.backoff_factor.is_finite() {
            self.backoff_factor = default_backoff_factor();
        }
        self.backoff_factor = self.backoff_factor.clamp(1.0, 10.0);
    }

    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay_ms: self.initial_delay_ms,
            backoff_factor: self.backoff_factor,
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay() -> u64 {
    4000
}

fn default_backoff_factor() -> f64 {
    1.5
}

/// Settings manager for loading, saving, and resetting settings
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a new settings manager rooted at the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join(SETTINGS_FILE),
        }
    }

    /// Create a manager at the platform data directory
    pub fn at_default_location() -> CoreResult<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| CoreError::Internal("could not determine data directory".to_string()))?
            .join("reelforge");
        Ok(Self::new(dir))
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        // Ensure parent directory exists so the lock file can be created.
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)?;
        } else {
            fs2::FileExt::lock_shared(&lock_file)?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if file doesn't exist
    pub fn load(&self) -> StudioSettings {
        let result = self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(StudioSettings::default());
            }

            let content = std::fs::read_to_string(&self.settings_path)?;
            let mut settings = serde_json::from_str::<StudioSettings>(&content)?;

            // Run migrations if needed
            if settings.version < SETTINGS_VERSION {
                info!(
                    "Migrating settings from version {} to {}",
                    settings.version, SETTINGS_VERSION
                );
                settings = self.migrate(settings);
            }

            settings.normalize();
            Ok(settings)
        });

        match result {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                StudioSettings::default()
            }
        }
    }

    /// Save settings to disk using atomic write (temp file + rename)
    pub fn save(&self, settings: &StudioSettings) -> CoreResult<StudioSettings> {
        self.with_lock(true, || {
            // Normalize before persisting.
            let mut normalized = settings.clone();
            normalized.normalize();

            corefs::atomic_write_json_pretty(&self.settings_path, &normalized)?;

            info!("Settings saved to {:?}", self.settings_path);
            Ok(normalized)
        })
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<StudioSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                std::fs::remove_file(&self.settings_path)?;
                info!("Settings file deleted");
            }
            Ok(StudioSettings::default())
        })
    }

    /// Migrate settings from older version
    fn migrate(&self, mut settings: StudioSettings) -> StudioSettings {
        // Future migrations would go here
        settings.version = SETTINGS_VERSION;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = StudioSettings::default();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.gateway.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.gateway.video_model, DEFAULT_VIDEO_MODEL);
        assert_eq!(settings.generation.batch_size, 8);
        assert_eq!(settings.generation.video_poll_limit, 60);
        assert_eq!(settings.retry.max_retries, 5);
        assert!(settings.gateway.api_key.is_none());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = StudioSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let deserialized: StudioSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn test_key_fallback_chain() {
        let mut gateway = GatewaySettings::default();
        assert!(gateway.resolved_text_key().is_none());
        assert!(!gateway.is_configured());

        gateway.api_key = Some("shared".to_string());
        assert_eq!(gateway.resolved_text_key(), Some("shared"));
        assert_eq!(gateway.resolved_video_key(), Some("shared"));
        assert!(gateway.is_configured());

        gateway.video_key = Some("video-only".to_string());
        assert_eq!(gateway.resolved_video_key(), Some("video-only"));
        assert_eq!(gateway.resolved_image_key(), Some("shared"));
    }

    #[test]
    fn test_normalize_blank_keys_become_none() {
        let mut gateway = GatewaySettings {
            api_key: Some("  ".to_string()),
            text_key: Some(" padded ".to_string()),
            ..GatewaySettings::default()
        };
        gateway.normalize();
        assert!(gateway.api_key.is_none());
        assert_eq!(gateway.text_key.as_deref(), Some("padded"));
    }

    #[test]
    fn test_normalize_urls_and_model() {
        let mut gateway = GatewaySettings {
            base_url: "https://relay.example/".to_string(),
            music_base_url: "   ".to_string(),
            video_model: "not-a-model".to_string(),
            ..GatewaySettings::default()
        };
        gateway.normalize();
        assert_eq!(gateway.base_url, "https://relay.example");
        assert_eq!(gateway.music_base_url, DEFAULT_BASE_URL);
        assert_eq!(gateway.video_model, DEFAULT_VIDEO_MODEL);
    }

    #[test]
    fn test_build_gateway_without_key_fails() {
        let gateway = GatewaySettings::default();
        assert!(matches!(
            gateway.build_gateway(),
            Err(CoreError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_build_gateway_with_shared_key() {
        let settings = GatewaySettings {
            api_key: Some("k".to_string()),
            ..GatewaySettings::default()
        };
        assert!(settings.build_gateway().is_ok());
    }

    #[test]
    fn test_generation_normalization_clamps() {
        let mut generation = GenerationSettings {
            batch_size: 0,
            batch_pause_ms: 99_999,
            video_poll_interval_ms: 1,
            video_poll_limit: 0,
            music_poll_interval_ms: 999_999,
            music_poll_limit: 10_000,
        };
        generation.normalize();
        assert_eq!(generation.batch_size, 1);
        assert_eq!(generation.batch_pause_ms, 10_000);
        assert_eq!(generation.video_poll_interval_ms, 500);
        assert_eq!(generation.video_poll_limit, 1);
        assert_eq!(generation.music_poll_interval_ms, 60_000);
        assert_eq!(generation.music_poll_limit, 600);
    }

    #[test]
    fn test_retry_normalization_handles_nan() {
        let mut retry = RetrySettings {
            max_retries: 99,
            initial_delay_ms: 1,
            backoff_factor: f64::NAN,
        };
        retry.normalize();
        assert_eq!(retry.max_retries, 10);
        assert_eq!(retry.initial_delay_ms, 100);
        assert_eq!(retry.backoff_factor, 1.5);
    }

    #[test]
    fn test_retry_settings_to_policy() {
        let retry = RetrySettings::default();
        let policy = retry.to_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay_ms, 4000);
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        let settings = manager.load();
        assert_eq!(settings, StudioSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        let mut settings = StudioSettings::default();
        settings.gateway.api_key = Some("sk-test-key".to_string());
        settings.gateway.video_model = "veo3-pro-frames".to_string();
        settings.generation.batch_size = 4;

        manager.save(&settings).unwrap();
        let loaded = manager.load();

        assert_eq!(loaded.gateway.api_key.as_deref(), Some("sk-test-key"));
        assert_eq!(loaded.gateway.video_model, "veo3-pro-frames");
        assert_eq!(loaded.generation.batch_size, 4);
    }

    #[test]
    fn test_invalid_json_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join(SETTINGS_FILE);
        std::fs::write(&settings_path, "invalid json {{{").unwrap();

        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        let settings = manager.load();

        assert_eq!(settings, StudioSettings::default());
    }

    #[test]
    fn test_partial_json_uses_defaults_for_missing() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join(SETTINGS_FILE);
        std::fs::write(
            &settings_path,
            r#"{"version": 1, "gateway": {"apiKey": "abc"}}"#,
        )
        .unwrap();

        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        let settings = manager.load();

        // Custom value preserved
        assert_eq!(settings.gateway.api_key.as_deref(), Some("abc"));
        // Defaults for missing fields
        assert_eq!(settings.generation.batch_size, 8);
        assert_eq!(settings.retry.max_retries, 5);
    }

    #[test]
    fn test_save_normalizes_before_persisting() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        let mut settings = StudioSettings::default();
        settings.generation.batch_size = 9999;
        settings.gateway.base_url = "https://relay.example///".to_string();

        let saved = manager.save(&settings).unwrap();
        assert_eq!(saved.generation.batch_size, 32);
        assert_eq!(saved.gateway.base_url, "https://relay.example");

        let loaded = manager.load();
        assert_eq!(loaded.generation.batch_size, 32);
    }

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        manager.save(&StudioSettings::default()).unwrap();

        // Temp file should not exist after successful write
        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert!(!names.iter().any(|n| n.ends_with(".tmp")));
        assert!(manager.settings_path().exists());
    }

    #[test]
    fn test_reset_deletes_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        manager.save(&StudioSettings::default()).unwrap();
        assert!(manager.settings_path().exists());

        let reset_settings = manager.reset().unwrap();
        assert!(!manager.settings_path().exists());
        assert_eq!(reset_settings, StudioSettings::default());
    }

    #[test]
    fn test_old_version_is_migrated() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join(SETTINGS_FILE);
        std::fs::write(&settings_path, r#"{"version": 0}"#).unwrap();

        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        let settings = manager.load();

        assert_eq!(settings.version, SETTINGS_VERSION);
    }

    #[test]
    fn test_concurrent_read_write() {
        use std::sync::Arc;
        use std::thread;

        let temp_dir = TempDir::new().unwrap();
        let manager = Arc::new(SettingsManager::new(temp_dir.path().to_path_buf()));

        manager.save(&StudioSettings::default()).unwrap();

        let mut handles = vec![];

        for _ in 0..5 {
            let manager_clone = Arc::clone(&manager);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    let _ = manager_clone.load();
                    thread::sleep(std::time::Duration::from_millis(1));
                }
            }));
        }

        for i in 0..3u32 {
            let manager_clone = Arc::clone(&manager);
            handles.push(thread::spawn(move || {
                for j in 0..5u32 {
                    let mut settings = StudioSettings::default();
                    settings.generation.batch_size = (i * 10 + j).max(1);
                    let _ = manager_clone.save(&settings);
                    thread::sleep(std::time::Duration::from_millis(2));
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread should not panic");
        }

        // Verify file is still valid
        let final_settings = manager.load();
        assert!(final_settings.generation.batch_size >= 1);
        assert!(final_settings.generation.batch_size <= 32);
    }
}
