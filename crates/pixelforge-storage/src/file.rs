//! JSON file storage backend.

use crate::{KeyValueStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Storage backed by a single JSON object on disk.
///
/// The file is read once on open; every mutation rewrites it through a
/// synced temporary file and a rename so a crash never leaves a torn file.
/// On Unix the file is created with mode `0600` since it holds the bearer
/// token.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let data = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                StorageError::Encoding(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = data.len(), "Opened file storage");

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let encoded =
            serde_json::to_vec_pretty(data).map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp = self.tmp_path();
        let written = write_private(&tmp, &encoded).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        if let Some(dir) = self.path.parent().and_then(|parent| fs::File::open(parent).ok()) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "storage.json".to_string());
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), nanos))
    }
}

/// Write `bytes` to a new file readable only by its owner, synced to disk.
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl KeyValueStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock();
        data.insert(key.to_string(), value.to_string());
        self.flush(&data)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock();
        if data.remove(key).is_none() {
            return Ok(false);
        }
        self.flush(&data)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("token", "T1").unwrap();
        storage.set("auth", r#"{"token":"T1"}"#).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap(), Some("T1".to_string()));
        assert!(reopened.has("auth").unwrap());
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("token", "T1").unwrap();
        assert!(storage.delete("token").unwrap());
        assert!(!storage.delete("token").unwrap());

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap(), None);
    }

    #[test]
    fn test_missing_file_is_empty_and_not_created_until_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("token").unwrap(), None);
        assert!(!path.exists());

        storage.set("token", "T1").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_an_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Encoding(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("token", "SECRET").unwrap();
        storage.set("auth", "{}").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "mode was {:o}", mode & 0o777);
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("token", "T1").unwrap();
        storage.set("token", "T2").unwrap();
        storage.delete("token").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("storage.json")]);
    }

    #[test]
    fn test_failed_write_removes_temporary_file() {
        let dir = tempdir().unwrap();
        // A non-empty directory at the target path makes the rename fail.
        let path = dir.path().join("storage.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let storage = FileStorage {
            path,
            data: Mutex::new(BTreeMap::new()),
        };
        assert!(storage.set("token", "T1").is_err());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("storage.json")]);
    }
}
