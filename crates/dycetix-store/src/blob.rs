//! Blob backends
//!
//! Keys are relative, `/`-separated paths such as
//! `form_attachments/2026/03/09/<uuid>_logo.png`. Both backends reject keys
//! that are empty, absolute, or contain `.`/`..` segments.

use crate::error::StoreError;
use crate::traits::{BlobStore, StoredBlob};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Default public prefix for stored blobs
pub const DEFAULT_MEDIA_URL: &str = "/media";

fn check_key(key: &str) -> Result<(), StoreError> {
    let bad_segment = key
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\'));
    if key.is_empty() || bad_segment {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn join_url(base_url: &str, key: &str) -> String {
    format!("{}/{key}", base_url.trim_end_matches('/'))
}

/// Blobs as files under a root directory
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FilesystemBlobStore {
    /// Create a store rooted at `root`, served under `base_url`
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn full_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        check_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, seg| path.join(seg)))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<StoredBlob, StoreError> {
        let path = self.full_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // write to a sibling temp file, then rename into place
        let temp = path.with_extension("part");
        let mut file = fs::File::create(&temp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, &path).await?;

        tracing::debug!(key, size = data.len(), "blob stored");
        Ok(StoredBlob {
            key: key.to_string(),
            url: self.url_for(key),
            size: data.len() as u64,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.full_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found("blob", key))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.full_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.full_path(key)?;
        Ok(fs::try_exists(path).await?)
    }

    fn url_for(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }
}

/// Blobs held in a concurrent map
#[derive(Debug)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
    base_url: String,
}

impl MemoryBlobStore {
    /// Create an empty store served under `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            blobs: DashMap::new(),
            base_url: base_url.into(),
        }
    }

    /// Number of stored blobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_URL)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<StoredBlob, StoreError> {
        check_key(key)?;
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(StoredBlob {
            key: key.to_string(),
            url: self.url_for(key),
            size: data.len() as u64,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        check_key(key)?;
        self.blobs
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found("blob", key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.blobs.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        check_key(key)?;
        Ok(self.blobs.contains_key(key))
    }

    fn url_for(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }
}
