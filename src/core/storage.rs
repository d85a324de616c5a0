//! Local key-value snapshot storage
//!
//! Each key maps to one JSON document under `.agency/storage/<key>.json`.
//! Snapshots are written whole on every change and read back on load;
//! there is no schema versioning. Read failures are logged and callers
//! fall back to an in-memory default.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::workspace::Workspace;

/// Well-known storage keys
pub mod keys {
    /// Handoff slot between `quote new` and `quote print`
    pub const QUOTE_PRINT_DATA: &str = "quotePrintData";

    pub fn cronograma_projects(nit: &str) -> String {
        format!("cronograma_projects_{}", nit)
    }

    pub fn gallery_access(gallery_id: &str) -> String {
        format!("gallery_access_{}", gallery_id)
    }

    pub fn survey_draft(survey: &str) -> String {
        format!("survey_draft_{}", survey)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read '{key}': {message}")]
    Read { key: String, message: String },

    #[error("failed to write '{key}': {message}")]
    Write { key: String, message: String },

    #[error("stored value for '{key}' is not valid JSON for this record: {message}")]
    Decode { key: String, message: String },
}

/// Snapshot store rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn open(workspace: &Workspace) -> Self {
        Self::new(workspace.storage_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }

    /// Read and decode a key. Missing keys are `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| StorageError::Read {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Decode {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    /// Read a key, logging any failure and returning the type's default instead
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "local snapshot unreadable, using empty default");
                T::default()
            }
        }
    }

    /// Encode and write a key, replacing any previous snapshot
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let write_err = |message: String| StorageError::Write {
            key: key.to_string(),
            message,
        };

        fs::create_dir_all(&self.dir).map_err(|e| write_err(e.to_string()))?;
        let json = serde_json::to_string_pretty(value).map_err(|e| write_err(e.to_string()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| write_err(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| write_err(e.to_string()))?;

        tracing::debug!(key, path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Write a key, logging a failure instead of returning it
    pub fn set_or_warn<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "local snapshot not saved");
                false
            }
        }
    }

    /// Remove a key. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| StorageError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(true)
    }

    /// Remove a key, logging a failure instead of returning it
    pub fn remove_or_warn(&self, key: &str) -> bool {
        match self.remove(key) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(key, error = %e, "local snapshot not removed");
                false
            }
        }
    }

    /// List stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        keys.sort();
        keys
    }
}
