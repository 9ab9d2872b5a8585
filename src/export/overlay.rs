//! Overlay / Sticker Source Extraction
//!
//! Pass 3 of the export resolver: converts percentage-based center
//! placements into absolute pixel top-left coordinates, resolves each
//! overlay asset to a local raster file (rasterizing vector content at the
//! target pixel size), and orders the results by z-index.

use std::path::PathBuf;

use tokio::task::JoinSet;
use tracing::warn;

use crate::assets::Asset;
use crate::error::{CoreError, CoreResult};
use crate::export::materialize::materialize_asset;
use crate::export::{CancelToken, SourceResolver};
use crate::timeline::{Canvas, ElementKind, OverlayPlacement, Timeline, TrackKind};
use crate::types::{Size2D, TimeSec};

/// Positioned raster input for the encoder's overlay chain
#[derive(Clone, Debug, PartialEq)]
pub struct OverlaySource {
    pub path: PathBuf,
    /// Top-left corner in pixels
    pub x: f64,
    pub y: f64,
    /// Size in pixels
    pub width: f64,
    pub height: f64,
    pub z_index: i32,
    pub opacity: f32,
    pub rotation_deg: f64,
    pub start_time: TimeSec,
    pub end_time: TimeSec,
}

/// Pixel-space placement derived from a percentage-based one:
/// `topLeft = centerPixel - sizePixel / 2`
pub fn placement_to_pixels(placement: &OverlayPlacement, canvas: &Canvas) -> (f64, f64, f64, f64) {
    let canvas_w = canvas.width as f64;
    let canvas_h = canvas.height as f64;

    let width = canvas_w * placement.width_pct / 100.0;
    let height = canvas_h * placement.height_pct / 100.0;
    let center_x = canvas_w * placement.x_pct / 100.0;
    let center_y = canvas_h * placement.y_pct / 100.0;

    (center_x - width / 2.0, center_y - height / 2.0, width, height)
}

struct OverlayCandidate {
    element_id: String,
    element_name: String,
    asset: Asset,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    z_index: i32,
    opacity: f32,
    rotation_deg: f64,
    start_time: TimeSec,
    end_time: TimeSec,
}

impl SourceResolver {
    /// Resolves sticker and overlay-composition elements to positioned
    /// raster sources, ascending by z-index.
    ///
    /// Raster assets already on disk are reused without re-encoding; vector
    /// assets go through the rasterizer collaborator at the target pixel
    /// size, or are dropped with a logged reason when none is configured.
    pub async fn resolve_overlay_sources(
        &self,
        timeline: &Timeline,
        cancel: &CancelToken,
    ) -> CoreResult<Vec<OverlaySource>> {
        let candidates = collect_candidates(self, timeline);

        let mut set = JoinSet::new();
        for candidate in candidates {
            let store = self.store.clone();
            let fetcher = self.fetcher.clone();
            let rasterizer = self.rasterizer.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                let resolved = if candidate.asset.is_vector() {
                    let target = Size2D::new(
                        candidate.width.round().max(1.0) as u32,
                        candidate.height.round().max(1.0) as u32,
                    );
                    match &rasterizer {
                        Some(rasterizer) if !cancel.is_cancelled() => rasterizer
                            .rasterize(&candidate.asset, target)
                            .await
                            .map_err(CoreError::Resolution),
                        Some(_) => Err(CoreError::Cancelled),
                        None => Err(CoreError::Resolution(
                            "vector asset but no rasterizer configured".to_string(),
                        )),
                    }
                } else {
                    materialize_asset(&store, &fetcher, &cancel, &candidate.asset).await
                };
                (candidate, resolved)
            });
        }

        let mut sources = Vec::new();
        while let Some(joined) = set.join_next().await {
            let Ok((candidate, resolved)) = joined else {
                warn!("overlay candidate task failed to join, dropping");
                continue;
            };
            match resolved {
                Ok(path) => sources.push((
                    candidate.element_id.clone(),
                    OverlaySource {
                        path,
                        x: candidate.x,
                        y: candidate.y,
                        width: candidate.width,
                        height: candidate.height,
                        z_index: candidate.z_index,
                        opacity: candidate.opacity,
                        rotation_deg: candidate.rotation_deg,
                        start_time: candidate.start_time,
                        end_time: candidate.end_time,
                    },
                )),
                Err(reason) => {
                    warn!(
                        element = %candidate.element_name,
                        asset = %candidate.asset.id,
                        %reason,
                        "dropping overlay source"
                    );
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        sources.sort_by(|(a_id, a), (b_id, b)| {
            a.z_index.cmp(&b.z_index).then_with(|| a_id.cmp(b_id))
        });
        Ok(sources.into_iter().map(|(_, source)| source).collect())
    }
}

fn collect_candidates(resolver: &SourceResolver, timeline: &Timeline) -> Vec<OverlayCandidate> {
    let mut candidates = Vec::new();

    for track in &timeline.tracks {
        if !matches!(
            track.kind,
            TrackKind::Sticker | TrackKind::OverlayComposition
        ) {
            continue;
        }
        for element in &track.elements {
            if element.hidden {
                continue;
            }
            let (asset_id, placement) = match &element.kind {
                ElementKind::Sticker {
                    asset_id,
                    placement,
                }
                | ElementKind::OverlayComposition {
                    asset_id,
                    placement,
                } => (asset_id, placement),
                _ => continue,
            };
            let Some(asset) = resolver.registry.get(asset_id) else {
                warn!(asset_id, "overlay pass: stale asset reference, dropping");
                continue;
            };

            let (x, y, width, height) = placement_to_pixels(placement, &timeline.canvas);
            candidates.push(OverlayCandidate {
                element_id: element.id.clone(),
                element_name: element.name.clone(),
                asset,
                x,
                y,
                width,
                height,
                z_index: placement.z_index,
                opacity: placement.opacity,
                rotation_deg: placement.rotation_deg,
                start_time: element.start_time,
                end_time: element.end_time(),
            });
        }
    }

    candidates
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetKind, InMemoryAssetRegistry};
    use crate::export::{DiskTempFileStore, VectorRasterizer};
    use crate::timeline::{Element, Track};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn sticker_element(name: &str, asset_id: &str, placement: OverlayPlacement) -> Element {
        Element::new(
            name,
            5.0,
            0.0,
            ElementKind::Sticker {
                asset_id: asset_id.to_string(),
                placement,
            },
        )
    }

    fn timeline_with_stickers(elements: Vec<Element>) -> Timeline {
        let mut timeline = Timeline::new("Test", Canvas::new(1920, 1080));
        let mut track = Track::new("Stickers", TrackKind::Sticker);
        track.elements = elements;
        timeline.tracks.push(track);
        timeline
    }

    #[test]
    fn test_placement_to_pixels_centered() {
        let placement = OverlayPlacement {
            x_pct: 50.0,
            y_pct: 50.0,
            width_pct: 10.0,
            height_pct: 20.0,
            ..Default::default()
        };
        let (x, y, w, h) = placement_to_pixels(&placement, &Canvas::new(1920, 1080));

        assert_eq!(w, 192.0);
        assert_eq!(h, 216.0);
        assert_eq!(x, 960.0 - 96.0);
        assert_eq!(y, 540.0 - 108.0);
    }

    #[tokio::test]
    async fn test_overlays_ordered_by_z_index() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("s.png");
        std::fs::write(&png, b"png").unwrap();

        let mut registry = InMemoryAssetRegistry::new();
        registry.insert(Asset::new("s1", AssetKind::Image, "s.png").with_local_path(&png));

        let top = OverlayPlacement {
            z_index: 5,
            ..Default::default()
        };
        let bottom = OverlayPlacement {
            z_index: 1,
            ..Default::default()
        };
        let timeline = timeline_with_stickers(vec![
            sticker_element("top", "s1", top),
            sticker_element("bottom", "s1", bottom),
        ]);

        let resolver = SourceResolver::new(
            Arc::new(registry),
            Arc::new(DiskTempFileStore::new(dir.path())),
        );
        let sources = resolver
            .resolve_overlay_sources(&timeline, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].z_index, 1);
        assert_eq!(sources[1].z_index, 5);
    }

    #[tokio::test]
    async fn test_raster_asset_reused_without_reencoding() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("s.png");
        std::fs::write(&png, b"png").unwrap();

        let mut registry = InMemoryAssetRegistry::new();
        registry.insert(Asset::new("s1", AssetKind::Image, "s.png").with_local_path(&png));

        let timeline =
            timeline_with_stickers(vec![sticker_element("s", "s1", OverlayPlacement::default())]);

        let resolver = SourceResolver::new(
            Arc::new(registry),
            Arc::new(DiskTempFileStore::new(dir.path())),
        );
        let sources = resolver
            .resolve_overlay_sources(&timeline, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(sources[0].path, png);
    }

    struct RecordingRasterizer {
        output: PathBuf,
        requested: Mutex<Option<Size2D>>,
    }

    #[async_trait]
    impl VectorRasterizer for RecordingRasterizer {
        async fn rasterize(&self, _asset: &Asset, size: Size2D) -> Result<PathBuf, String> {
            *self.requested.lock().unwrap() = Some(size);
            Ok(self.output.clone())
        }
    }

    #[tokio::test]
    async fn test_vector_asset_goes_through_rasterizer() {
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("logo.png");
        std::fs::write(&raster, b"png").unwrap();

        let mut registry = InMemoryAssetRegistry::new();
        registry.insert(Asset::new("v1", AssetKind::Image, "logo.svg"));

        let placement = OverlayPlacement {
            width_pct: 10.0,
            height_pct: 10.0,
            ..Default::default()
        };
        let timeline = timeline_with_stickers(vec![sticker_element("logo", "v1", placement)]);

        let rasterizer = Arc::new(RecordingRasterizer {
            output: raster.clone(),
            requested: Mutex::new(None),
        });
        let resolver = SourceResolver::new(
            Arc::new(registry),
            Arc::new(DiskTempFileStore::new(dir.path())),
        )
        .with_rasterizer(rasterizer.clone());

        let sources = resolver
            .resolve_overlay_sources(&timeline, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(sources[0].path, raster);
        // Rasterized at the placement's pixel size on a 1920x1080 canvas.
        let requested = rasterizer.requested.lock().unwrap().unwrap();
        assert_eq!(requested, Size2D::new(192, 108));
    }

    #[tokio::test]
    async fn test_vector_without_rasterizer_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("s.png");
        std::fs::write(&png, b"png").unwrap();

        let mut registry = InMemoryAssetRegistry::new();
        registry.insert(Asset::new("v1", AssetKind::Image, "logo.svg"));
        registry.insert(Asset::new("s1", AssetKind::Image, "s.png").with_local_path(&png));

        let timeline = timeline_with_stickers(vec![
            sticker_element("logo", "v1", OverlayPlacement::default()),
            sticker_element("s", "s1", OverlayPlacement::default()),
        ]);

        let resolver = SourceResolver::new(
            Arc::new(registry),
            Arc::new(DiskTempFileStore::new(dir.path())),
        );
        let sources = resolver
            .resolve_overlay_sources(&timeline, &CancelToken::new())
            .await
            .unwrap();

        // The vector candidate drops; the raster one survives.
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].path, png);
    }
}
