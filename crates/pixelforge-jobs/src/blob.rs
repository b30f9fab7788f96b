//! Process-local blob handles for downloaded bytes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const BLOB_SCHEME_PREFIX: &str = "blob:pixelforge/";

/// Locally addressable handle to bytes held in a [`BlobRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    fn generate() -> Self {
        Self(format!("{BLOB_SCHEME_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live blobs. Cloning shares the same registry.
///
/// Every [`BlobRegistry::create`] must be paired with a
/// [`BlobRegistry::revoke`]; [`BlobRegistry::live_count`] makes leaks visible.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<HashMap<BlobUrl, Arc<[u8]>>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>) -> BlobUrl {
        let url = BlobUrl::generate();
        let len = bytes.len();
        self.blobs.lock().insert(url.clone(), Arc::from(bytes));
        debug!(url = %url, len, "Blob created");
        url
    }

    pub fn get(&self, url: &BlobUrl) -> Option<Arc<[u8]>> {
        self.blobs.lock().get(url).cloned()
    }

    /// Release a blob. Returns false if it was already gone.
    pub fn revoke(&self, url: &BlobUrl) -> bool {
        let removed = self.blobs.lock().remove(url).is_some();
        if removed {
            debug!(url = %url, "Blob revoked");
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.blobs.lock().len()
    }
}

/// Where a downloaded artifact ends up.
pub trait SaveTarget: Send + Sync {
    /// Persist `bytes` under `filename`, returning the final location.
    fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Saves into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySaveTarget {
    dir: PathBuf,
}

impl DirectorySaveTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveTarget for DirectorySaveTarget {
    fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        // Never let a server-supplied name escape the directory.
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid file name: {filename:?}"),
                )
            })?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}
