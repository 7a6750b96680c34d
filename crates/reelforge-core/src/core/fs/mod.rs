//! Filesystem utilities.
//!
//! Safe primitives for writing files in a crash-tolerant way.
//!
//! Project files and downloaded media are the only durable record of a
//! production run. A partial write (power loss, crash) must not leave them
//! unrecoverable, and Windows semantics differ from Unix for
//! rename-over-existing; both are handled here.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{CoreError, CoreResult};

/// Validates that an identifier component is safe to use in file paths.
///
/// Scene and shot identifiers from a loaded project file end up in media
/// filenames (`clip-<id>.mp4`); a hostile project file must not be able to
/// steer writes outside the project directory.
pub fn validate_path_id_component(id: &str, label: &str) -> Result<(), String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(format!("{label} is empty or contains only whitespace"));
    }
    if trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
    {
        return Err(format!(
            "Invalid {label}: contains path traversal characters"
        ));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(format!("Invalid {label}: contains control characters"));
    }
    Ok(())
}

/// Write bytes to `path` using an atomic replace pattern.
///
/// Implementation notes:
/// - Write to a sibling temporary file.
/// - Flush and sync the temp file.
/// - Swap into place by renaming.
/// - If the destination exists, it is first moved aside as a `.bak` file,
///   then removed.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)?;
    Ok(())
}

/// Write a JSON file atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "tmp".to_string());
    tmp.set_file_name(format!("{file_name}.tmp"));
    tmp
}

fn bak_path_for(path: &Path) -> PathBuf {
    let mut bak = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "bak".to_string());
    bak.set_file_name(format!("{file_name}.bak"));
    bak
}

fn atomic_replace(dest: &Path, src_tmp: &Path) -> CoreResult<()> {
    // Fast path: dest does not exist.
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    // Windows: rename-over-existing may fail depending on filesystem; use a backup swap.
    let bak = bak_path_for(dest);

    // Best-effort cleanup of stale backup.
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            // Try to restore the old file.
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(src_tmp);
            Err(CoreError::IoError(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_bytes_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.json");

        atomic_write_bytes(&path, b"one").unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, "one");

        atomic_write_bytes(&path, b"two").unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(second, "two");
    }

    #[test]
    fn atomic_write_bytes_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("film.json");

        atomic_write_bytes(&path, b"data").unwrap();
        atomic_write_bytes(&path, b"data2").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["film.json".to_string()]);
    }

    #[test]
    fn atomic_write_json_pretty_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("value.json");

        atomic_write_json_pretty(&path, &serde_json::json!({"a": 1})).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_validate_path_id_component_valid() {
        assert!(validate_path_id_component("scene-3-p1", "shotId").is_ok());
        assert!(validate_path_id_component("01HXYZ123ABC", "sceneId").is_ok());
        assert!(validate_path_id_component("cover", "sceneId").is_ok());
    }

    #[test]
    fn test_validate_path_id_component_path_traversal() {
        assert!(validate_path_id_component("..", "shotId").is_err());
        assert!(validate_path_id_component("foo/../bar", "shotId").is_err());
        assert!(validate_path_id_component("foo/bar", "shotId").is_err());
        assert!(validate_path_id_component("foo\\bar", "shotId").is_err());
        assert!(validate_path_id_component("C:", "shotId").is_err());
    }

    #[test]
    fn test_validate_path_id_component_control_characters() {
        assert!(validate_path_id_component("foo\0bar", "shotId").is_err());
        assert!(validate_path_id_component("foo\nbar", "shotId").is_err());
    }

    #[test]
    fn test_validate_path_id_component_empty() {
        let result = validate_path_id_component("  ", "shotId");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("empty"));
    }
}
