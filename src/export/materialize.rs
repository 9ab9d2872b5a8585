//! Materialization Collaborators
//!
//! Traits for the file-system and network collaborators the export
//! resolver hands work to, plus the cancellation signal threaded through
//! long-running resolution passes. Timeout policy lives on the fetcher
//! side of the boundary, not here.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::assets::Asset;
use crate::error::{CoreError, CoreResult};
use crate::types::Size2D;

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation signal checked between per-candidate
/// resolution steps
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Temp-file materialization API: flushes in-memory or fetched bytes to
/// disk before paths are handed to the encoder
#[async_trait]
pub trait TempFileStore: Send + Sync {
    /// Writes bytes to a temp file and returns its path
    async fn save_temp(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, String>;

    /// Verifies a previously resolved path still exists
    fn file_exists(&self, path: &Path) -> bool;
}

/// Network collaborator for remote assets. Timeout and retry policy belong
/// to the implementation.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Rasterizes vector assets to a raster file at a target pixel size
#[async_trait]
pub trait VectorRasterizer: Send + Sync {
    async fn rasterize(&self, asset: &Asset, size: Size2D) -> Result<PathBuf, String>;
}

// =============================================================================
// Disk-backed Temp Store
// =============================================================================

/// [`TempFileStore`] writing into a base directory, with ULID-prefixed
/// names to avoid collisions between parallel candidates
pub struct DiskTempFileStore {
    base_dir: PathBuf,
}

impl DiskTempFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl TempFileStore for DiskTempFileStore {
    async fn save_temp(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, String> {
        if bytes.is_empty() {
            return Err("refusing to write empty buffer".to_string());
        }
        let path = self
            .base_dir
            .join(format!("{}_{}", ulid::Ulid::new(), filename));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
        Ok(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

// =============================================================================
// Asset Materialization
// =============================================================================

/// Resolves an asset to a filesystem-backed input by priority: an existing
/// verified local path, then an in-memory blob flushed to a temp file, then
/// a remote URL fetched and flushed. The cancellation token is checked
/// between steps. Collaborator failures surface as [`CoreError::Resolution`].
pub(crate) async fn materialize_asset(
    store: &Arc<dyn TempFileStore>,
    fetcher: &Option<Arc<dyn MediaFetcher>>,
    cancel: &CancelToken,
    asset: &Asset,
) -> CoreResult<PathBuf> {
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }

    if let Some(path) = &asset.local_path {
        if store.file_exists(path) {
            return Ok(path.clone());
        }
    }

    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }

    if let Some(bytes) = asset.bytes.as_ref().filter(|b| !b.is_empty()) {
        return store
            .save_temp(bytes, &asset.name)
            .await
            .map_err(CoreError::Resolution);
    }

    if let (Some(url), Some(fetcher)) = (&asset.url, fetcher) {
        let bytes = fetcher.fetch(url).await.map_err(CoreError::Resolution)?;
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        return store
            .save_temp(&bytes, &asset.name)
            .await
            .map_err(CoreError::Resolution);
    }

    Err(CoreError::Resolution(
        "no local path, blob, or fetchable URL".to_string(),
    ))
}

// =============================================================================
// Tests
// =============================================================================
