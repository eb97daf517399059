//! Crash-safe file replacement for the record set

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::StoreError;

/// Read the backing file, `None` when it does not exist yet
pub(super) fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(format!(
            "failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Replace `path` with `payload` atomically
///
/// The payload goes to a temporary file in the target's directory, is synced,
/// then renamed over the target. Readers observe either the old file or the
/// complete new one. On failure the temporary file is removed and the target
/// is left untouched.
pub(super) fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&dir).map_err(|e| {
        StoreError::io(format!("failed to prepare {}: {}", dir.display(), e))
    })?;

    let temp_path = temp_path_for(&dir, path);

    if let Err(e) = write_and_rename(&temp_path, path, payload) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::io(format!(
            "failed to write {}: {}",
            path.display(),
            e
        )));
    }

    debug!(path = %path.display(), bytes = payload.len(), "Record set written");
    Ok(())
}

fn temp_path_for(dir: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "records".to_string());

    dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

fn write_and_rename(temp_path: &Path, target: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = create_private(temp_path)?;
    file.write_all(payload)?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, target)
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_if_exists(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn test_write_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.json");

        write_atomic(&path, b"{\"version\":1}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{\"version\":1}");
        assert_eq!(entries(&dir.path().join("nested")), vec!["records.json"]);
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(entries(dir.path()), vec!["records.json"]);
    }

    #[test]
    fn test_failed_rename_keeps_target_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target path makes the rename fail
        let path = dir.path().join("records.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let result = write_atomic(&path, b"payload");

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(path.is_dir());
        assert_eq!(entries(dir.path()), vec!["records.json"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        write_atomic(&path, b"{}").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
