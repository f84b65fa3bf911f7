//! Durable key-value preferences
//!
//! Small string entries the panel remembers between runs. The store reads
//! them once during `init` and writes them from the corresponding setters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, StorageError};

/// Preferred UI language code
pub const LANG_KEY: &str = "mm-lang";
/// Theme mode (`auto`, `light`, `dark`)
pub const THEME_KEY: &str = "mm-theme";
/// Whether the bottom navigation gets extra padding (`"true"` / `"false"`)
pub const FIX_NAV_KEY: &str = "mm-fix-nav";

/// Storage for small persisted preferences
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local preferences, used by tests and the mock front-end
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences kept in a JSON object file
///
/// The file is read once on open and rewritten in full on every `set`.
/// A missing file starts empty; a corrupt one is logged and replaced on the
/// next write.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable preferences: {}", e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> std::result::Result<BTreeMap<String, String>, StorageError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> std::result::Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)?;
        Ok(())
    }
}
