//! Export Source Resolution
//!
//! Translates a timeline snapshot into encoder-ready inputs in three
//! read-only passes: active elements at a sampled instant, audio source
//! descriptors, and positioned overlay sources. All resolution is
//! best-effort: candidates that cannot be materialized are dropped with a
//! logged reason rather than failing the export.

mod audio;
mod materialize;
mod overlay;
mod resolver;

pub use audio::AudioSource;
pub use materialize::{
    CancelToken, DiskTempFileStore, MediaFetcher, TempFileStore, VectorRasterizer,
};
pub use overlay::{placement_to_pixels, OverlaySource};
pub use resolver::{ResolvedActiveElement, SourceResolver};
