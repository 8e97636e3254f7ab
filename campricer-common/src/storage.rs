//! Durable key-value storage
//!
//! The pipeline persists whole JSON documents under fixed keys (the history
//! array, the camera-mode preference). Each key maps to one file under the
//! data directory; every write replaces the full document. There is no
//! multi-key transaction support and none is needed: a single UI action
//! drives mutation at a time.

use crate::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Storage key for the recent-results history array
pub const RECENT_RESULTS_KEY: &str = "recent_camera_results";

/// Storage key for the single-subject batch mode preference
pub const CAMERA_MODE_KEY: &str = "single_camera_mode";

/// File-backed key-value store of JSON documents
#[derive(Debug, Clone)]
pub struct KvStore {
    root: PathBuf,
}

impl KvStore {
    /// Open a store rooted at `root`, creating the directory if missing
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory holding this store's documents
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Read the document stored under `key`
    ///
    /// A missing key is `Ok(None)`; an unreadable or undecodable document is
    /// an error the caller decides how to tolerate.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Storage(format!("read {}: {}", path.display(), e))),
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Storage(format!("decode {}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    /// Replace the document stored under `key`
    pub async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.key_path(key);
        let bytes = serde_json::to_vec(value)
            .map_err(|e| Error::Storage(format!("encode {key}: {e}")))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Storage(format!("write {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Remove the document stored under `key`, if present
    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("remove {}: {}", path.display(), e))),
        }
    }
}
