//! On-device key/value cache backed by a JSON file.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ChatError;

/// Key under which the agent list is mirrored.
pub const AGENTS_KEY: &str = "agents";

/// Persistent key/value storage used as the registry's fallback.
///
/// Values live in memory and, when a path is configured, are written through
/// to a single JSON object on disk after every change.
pub struct LocalCache {
    path: Option<PathBuf>,
    entries: RwLock<Map<String, Value>>,
}

impl LocalCache {
    /// Create a cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(Map::new()),
        }
    }

    /// Open a cache file, starting empty if it is missing or unreadable.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(entries) => {
                    debug!("Loaded {} cache entries from {}", entries.len(), path.display());
                    entries
                }
                Err(err) => {
                    warn!("Ignoring corrupt cache file {}: {}", path.display(), err);
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(err) => {
                warn!("Failed to read cache file {}: {}", path.display(), err);
                Map::new()
            }
        };

        Self {
            path: Some(path),
            entries: RwLock::new(entries),
        }
    }

    /// Get the file backing this cache, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read and decode a value. Undecodable values read as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.read().await.get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!("Failed to decode cache entry {}: {}", key, err);
                None
            }
        }
    }

    /// Store a value and write the cache through to disk.
    ///
    /// The in-memory value is updated even when the disk write fails.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ChatError> {
        let encoded = serde_json::to_value(value).map_err(|e| ChatError::Cache(e.to_string()))?;

        let snapshot = {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), encoded);
            entries.clone()
        };

        self.persist(&snapshot).await
    }

    async fn persist(&self, entries: &Map<String, Value>) -> Result<(), ChatError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let raw =
            serde_json::to_string_pretty(entries).map_err(|e| ChatError::Cache(e.to_string()))?;

        // Write a sibling file first so a crash never leaves half a cache
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| ChatError::Cache(format!("write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| ChatError::Cache(format!("rename to {}: {}", path.display(), e)))?;

        Ok(())
    }
}
