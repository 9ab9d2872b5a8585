//! Asset Registry Interface
//!
//! Models for media assets and the registry collaborator the export
//! resolver reads from. The resolver never writes to the registry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{AssetId, Size2D, TimeSec};

/// Asset media type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
}

impl AssetKind {
    /// Video and audio assets carry an audio stream; images never do
    pub fn carries_audio(&self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Audio)
    }
}

/// Asset descriptor returned by the registry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    /// Display name, typically the original file name
    pub name: String,
    /// Verified local file path, if the asset is already on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Remote URL, if the asset lives on a server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// In-memory file contents, if the asset was imported as a blob
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    /// Pixel dimensions (video and image assets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Size2D>,
    /// Content duration in seconds (video and audio assets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<TimeSec>,
}

impl Asset {
    pub fn new(id: &str, kind: AssetKind, name: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: name.to_string(),
            local_path: None,
            url: None,
            bytes: None,
            dimensions: None,
            duration_sec: None,
        }
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(Size2D::new(width, height));
        self
    }

    pub fn with_duration(mut self, duration_sec: TimeSec) -> Self {
        self.duration_sec = Some(duration_sec);
        self
    }

    /// True when the in-memory blob is present and non-empty
    pub fn has_blob(&self) -> bool {
        self.bytes.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Heuristic for vector content that must be rasterized before the
    /// encoder can consume it
    pub fn is_vector(&self) -> bool {
        self.kind == AssetKind::Image
            && self
                .name
                .rsplit('.')
                .next()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
    }
}

/// Read-only registry lookup used by the export resolver
pub trait AssetRegistry: Send + Sync {
    /// Returns the asset for an id, or `None` for stale references
    fn get(&self, asset_id: &str) -> Option<Asset>;
}

/// Simple in-memory registry, used by tests and embedders that hold the
/// whole catalog in memory
#[derive(Default)]
pub struct InMemoryAssetRegistry {
    assets: std::collections::HashMap<AssetId, Asset>,
}

impl InMemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: Asset) {
        self.assets.insert(asset.id.clone(), asset);
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn get(&self, asset_id: &str) -> Option<Asset> {
        self.assets.get(asset_id).cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================
