//! Durable key/value storage for client state.
//!
//! Each key holds one whole blob. Writes replace the previous value
//! completely, so a failed write leaves the old blob readable.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::utils::{ensure_dir, safe_filename};

/// Key of the serialized session map
pub const CHATS_KEY: &str = "aiChats";

/// Key of the active theme name
pub const THEME_KEY: &str = "theme";

/// Whole-blob key/value store
pub trait Storage: Send + Sync {
    /// Read a blob; `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> crate::Result<Option<String>>;

    /// Replace the blob under `key`
    fn set(&self, key: &str, value: &str) -> crate::Result<()>;

    /// Remove a key; missing keys are not an error
    fn remove(&self, key: &str) -> crate::Result<()>;
}

/// Storage backed by one `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_filename(key)))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> crate::Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(crate::Error::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(key);
        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            crate::Error::Storage(format!("failed to replace {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> crate::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage, used by tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> crate::Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> crate::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
