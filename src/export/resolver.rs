//! Export Source Resolver
//!
//! Read-only resolution over a timeline snapshot. Holds the collaborator
//! handles shared by all three passes; the audio and overlay passes live in
//! their own modules. Resolver output is purely a function of the timeline
//! snapshot, the asset-registry snapshot and the sampling parameters.

use std::sync::Arc;

use crate::assets::{Asset, AssetRegistry};
use crate::export::{MediaFetcher, TempFileStore, VectorRasterizer};
use crate::timeline::{active_elements_at, Element, Timeline, TrackKind};
use crate::types::{TimeSec, TrackId};

/// An active element resolved against the asset registry
#[derive(Clone, Debug)]
pub struct ResolvedActiveElement {
    pub element: Element,
    pub track_id: TrackId,
    pub track_kind: TrackKind,
    /// Registry join for asset-backed elements; `None` for text-like kinds
    /// or stale asset references
    pub asset: Option<Asset>,
}

/// Export source resolver. Never mutates the timeline or the registry.
pub struct SourceResolver {
    pub(crate) registry: Arc<dyn AssetRegistry>,
    pub(crate) store: Arc<dyn TempFileStore>,
    pub(crate) fetcher: Option<Arc<dyn MediaFetcher>>,
    pub(crate) rasterizer: Option<Arc<dyn VectorRasterizer>>,
}

impl SourceResolver {
    pub fn new(registry: Arc<dyn AssetRegistry>, store: Arc<dyn TempFileStore>) -> Self {
        Self {
            registry,
            store,
            fetcher: None,
            rasterizer: None,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn VectorRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Pass 1: active elements at a sampled instant, joined against the
    /// asset registry for pixel dimensions and file locations. Output order
    /// is the stable track-then-element order of the underlying query.
    pub fn resolve_active_at(
        &self,
        timeline: &Timeline,
        time: TimeSec,
    ) -> Vec<ResolvedActiveElement> {
        active_elements_at(&timeline.tracks, time)
            .into_iter()
            .map(|active| ResolvedActiveElement {
                element: active.element.clone(),
                track_id: active.track.id.clone(),
                track_kind: active.track.kind,
                asset: active
                    .element
                    .asset_id()
                    .and_then(|id| self.registry.get(id)),
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetKind, InMemoryAssetRegistry};
    use crate::export::DiskTempFileStore;
    use crate::timeline::{Canvas, ElementKind, Track};

    fn resolver_with(registry: InMemoryAssetRegistry) -> (SourceResolver, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DiskTempFileStore::new(dir.path()));
        (SourceResolver::new(Arc::new(registry), store), dir)
    }

    #[test]
    fn test_resolve_active_joins_registry() {
        let mut registry = InMemoryAssetRegistry::new();
        registry.insert(
            Asset::new("a1", AssetKind::Video, "clip.mp4")
                .with_local_path("/media/clip.mp4")
                .with_dimensions(1920, 1080),
        );

        let mut timeline = Timeline::new("Test", Canvas::default());
        timeline.tracks[0].elements.push(Element::new(
            "clip",
            10.0,
            0.0,
            ElementKind::Media {
                asset_id: "a1".to_string(),
                volume: 1.0,
                muted: false,
            },
        ));

        let mut text = Track::new("Text 1", TrackKind::Text);
        text.elements.push(Element::new(
            "title",
            5.0,
            0.0,
            ElementKind::Text {
                text: "Hi".to_string(),
                font_family: "Inter".to_string(),
                font_size: 32.0,
                color: "#fff".to_string(),
            },
        ));
        timeline.tracks.push(text);

        let (resolver, _dir) = resolver_with(registry);
        let active = resolver.resolve_active_at(&timeline, 1.0);

        assert_eq!(active.len(), 2);
        let media = &active[0];
        assert_eq!(media.track_kind, TrackKind::Media);
        let asset = media.asset.as_ref().unwrap();
        assert_eq!(asset.dimensions.unwrap().width, 1920);
        // Text elements have no registry join.
        assert!(active[1].asset.is_none());
    }

    #[test]
    fn test_resolve_active_stale_asset_yields_none() {
        let mut timeline = Timeline::new("Test", Canvas::default());
        timeline.tracks[0].elements.push(Element::new(
            "clip",
            10.0,
            0.0,
            ElementKind::Media {
                asset_id: "missing".to_string(),
                volume: 1.0,
                muted: false,
            },
        ));

        let (resolver, _dir) = resolver_with(InMemoryAssetRegistry::new());
        let active = resolver.resolve_active_at(&timeline, 0.0);

        assert_eq!(active.len(), 1);
        assert!(active[0].asset.is_none());
    }

    #[test]
    fn test_resolver_determinism() {
        let mut registry = InMemoryAssetRegistry::new();
        registry.insert(Asset::new("a1", AssetKind::Video, "clip.mp4"));

        let mut timeline = Timeline::new("Test", Canvas::default());
        timeline.tracks[0].elements.push(Element::new(
            "clip",
            10.0,
            0.0,
            ElementKind::Media {
                asset_id: "a1".to_string(),
                volume: 1.0,
                muted: false,
            },
        ));

        let (resolver, _dir) = resolver_with(registry);
        let ids_of = |pass: &[ResolvedActiveElement]| -> Vec<String> {
            pass.iter().map(|r| r.element.id.clone()).collect()
        };

        let first = resolver.resolve_active_at(&timeline, 0.5);
        let second = resolver.resolve_active_at(&timeline, 0.5);
        assert_eq!(ids_of(&first), ids_of(&second));
    }
}
