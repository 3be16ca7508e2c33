// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed property store: one JSON document per key

use async_trait::async_trait;
use relog_core::{PropertyStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct StoredProperty {
    key: String,
    value: String,
}

/// Property store keeping each key in `<base>/<key>.json`.
///
/// Writes go through a temporary file and a rename, so readers in other
/// processes see either the old or the new value, never a torn one.
#[derive(Debug, Clone)]
pub struct FilePropertyStore {
    base_path: PathBuf,
}

impl FilePropertyStore {
    /// Open a store at the given path, creating it if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// All keys currently stored, sorted
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem() {
                    keys.push(stem.to_string_lossy().to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredProperty = serde_json::from_str(&json)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Some(stored.value))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(&StoredProperty {
            key: key.to_string(),
            value: value.to_string(),
        })
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let temp = self.base_path.join(format!(
            ".{}.{}.{}.tmp",
            key,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, json)?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keys become file names, so only `[A-Za-z0-9._-]` is allowed and the
/// key may not start with a dot.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
impl PropertyStore for FilePropertyStore {
    async fn get_property(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key)
    }

    async fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write(key, value)
    }

    async fn delete_property(&self, key: &str) -> Result<(), StoreError> {
        self.remove(key)
    }

    /// Each key is replaced atomically; the batch as a whole is not
    async fn set_properties(
        &self,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        for key in properties.keys() {
            validate_key(key)?;
        }
        for (key, value) in properties {
            self.write(key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "property_store_tests.rs"]
mod tests;
