//! Per-URL persistent key/value metadata.
//!
//! Each cached URL may carry a small metadata store kept next to the cached
//! file. It holds string properties and serialized objects, both addressed
//! by `prefix + key`. Writes are persisted immediately; the store is a cache
//! and a failed persist never invalidates in-memory state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::fs::write_atomic;

/// Errors persisting a metadata store.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to write metadata {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    properties: BTreeMap<String, String>,

    #[serde(default)]
    objects: BTreeMap<String, serde_json::Value>,
}

/// Persistent key/value store attached to one URL.
#[derive(Debug)]
pub struct MetadataStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl MetadataStore {
    /// Open (or lazily create) the store backed by `path`.
    ///
    /// An unreadable or corrupt file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("discarding corrupt metadata {}: {}", path.display(), e);
                StoreData::default()
            }),
            Err(_) => StoreData::default(),
        };

        MetadataStore {
            path: Some(path),
            data: RwLock::new(data),
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        MetadataStore {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, prefix: &str, key: &str) -> Option<String> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.properties.get(&format!("{prefix}{key}")).cloned()
    }

    pub fn set(&self, prefix: &str, key: &str, value: impl Into<String>) -> Result<(), MetadataError> {
        self.set_all(prefix, [(key, value.into())])
    }

    /// Set several properties under one prefix with a single persist.
    pub fn set_all<K, I>(&self, prefix: &str, entries: I) -> Result<(), MetadataError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, String)>,
    {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        for (key, value) in entries {
            data.properties
                .insert(format!("{prefix}{}", key.as_ref()), value);
        }
        self.persist(&data)
    }

    pub fn get_object<T: DeserializeOwned>(&self, prefix: &str, key: &str) -> Option<T> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        let value = data.objects.get(&format!("{prefix}{key}"))?;
        match serde_json::from_value(value.clone()) {
            Ok(object) => Some(object),
            Err(e) => {
                tracing::debug!("ignoring unreadable metadata object {prefix}{key}: {e}");
                None
            }
        }
    }

    pub fn set_object<T: Serialize>(&self, prefix: &str, key: &str, value: &T) -> Result<(), MetadataError> {
        let value = serde_json::to_value(value)?;
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.objects.insert(format!("{prefix}{key}"), value);
        self.persist(&data)
    }

    /// Remove every property and object whose key starts with `prefix`.
    pub fn clear(&self, prefix: &str) -> Result<(), MetadataError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.properties.retain(|k, _| !k.starts_with(prefix));
        data.objects.retain(|k, _| !k.starts_with(prefix));
        self.persist(&data)
    }

    /// Property keys under `prefix`, with the prefix stripped.
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.properties
            .keys()
            .chain(data.objects.keys())
            .filter_map(|k| k.strip_prefix(prefix))
            .map(str::to_string)
            .collect()
    }

    fn persist(&self, data: &StoreData) -> Result<(), MetadataError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = serde_json::to_vec_pretty(data)?;
        write_atomic(path, &contents).map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_properties_persist() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo.meta.json");

        let store = MetadataStore::open(&path);
        store.set("metadata.", "filename", "content.jar").unwrap();
        store.set("artifacts.", "filename", "artifacts.xml").unwrap();

        let reopened = MetadataStore::open(&path);
        assert_eq!(
            reopened.get("metadata.", "filename").as_deref(),
            Some("content.jar")
        );
        assert_eq!(
            reopened.get("artifacts.", "filename").as_deref(),
            Some("artifacts.xml")
        );
        assert!(reopened.get("metadata.", "kind").is_none());
    }

    #[test]
    fn test_objects_persist() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo.meta.json");

        let store = MetadataStore::open(&path);
        let children = vec!["https://a.example/".to_string(), "https://b.example/".to_string()];
        store.set_object("metadata.", "children", &children).unwrap();

        let reopened = MetadataStore::open(&path);
        let loaded: Vec<String> = reopened.get_object("metadata.", "children").unwrap();
        assert_eq!(loaded, children);
    }

    #[test]
    fn test_clear_prefix() {
        let store = MetadataStore::in_memory();
        store.set("metadata.", "filename", "content.xml").unwrap();
        store.set_object("metadata.", "children", &vec!["x"]).unwrap();
        store.set("artifacts.", "filename", "artifacts.xml").unwrap();

        store.clear("metadata.").unwrap();

        assert!(store.get("metadata.", "filename").is_none());
        assert!(store.get_object::<Vec<String>>("metadata.", "children").is_none());
        assert_eq!(
            store.get("artifacts.", "filename").as_deref(),
            Some("artifacts.xml")
        );
        assert_eq!(store.keys("artifacts."), vec!["filename".to_string()]);
    }

    #[test]
    fn test_corrupt_file_is_empty_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo.meta.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = MetadataStore::open(&path);
        assert!(store.keys("").is_empty());

        store.set("metadata.", "kind", "leaf").unwrap();
        assert_eq!(MetadataStore::open(&path).get("metadata.", "kind").as_deref(), Some("leaf"));
    }
}
