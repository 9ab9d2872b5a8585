//! Audio Source Extraction
//!
//! Pass 2 of the export resolver: walks media and audio tracks, resolves
//! every audio-carrying candidate to a filesystem-backed input in parallel,
//! drops failed candidates with a logged reason, and re-imposes a
//! deterministic start-time order on the survivors.

use std::path::PathBuf;

use tokio::task::JoinSet;
use tracing::warn;

use crate::assets::Asset;
use crate::error::{CoreError, CoreResult};
use crate::export::materialize::materialize_asset;
use crate::export::{CancelToken, SourceResolver};
use crate::timeline::{ElementKind, Timeline};
use crate::types::TimeSec;

/// Filesystem-backed audio input for the encoder
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSource {
    pub path: PathBuf,
    pub start_time: TimeSec,
    /// Linear volume (1.0 = 100%)
    pub volume: f32,
    /// Source trim window, so the encoder can seek within the file
    pub trim_start: TimeSec,
    pub trim_end: TimeSec,
}

struct AudioCandidate {
    element_name: String,
    asset: Asset,
    start_time: TimeSec,
    volume: f32,
    trim_start: TimeSec,
    trim_end: TimeSec,
}

impl SourceResolver {
    /// Resolves every audible media element to a `{path, startTime, volume}`
    /// descriptor, ascending by start time.
    ///
    /// Candidates resolve independently and in parallel; a single failure is
    /// logged and dropped without aborting the export. Muted tracks, muted
    /// elements, hidden elements and image-backed elements are excluded.
    pub async fn resolve_audio_sources(
        &self,
        timeline: &Timeline,
        cancel: &CancelToken,
    ) -> CoreResult<Vec<AudioSource>> {
        let candidates = collect_candidates(self, timeline);

        let mut set = JoinSet::new();
        for candidate in candidates {
            let store = self.store.clone();
            let fetcher = self.fetcher.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                let resolved =
                    materialize_asset(&store, &fetcher, &cancel, &candidate.asset).await;
                (candidate, resolved)
            });
        }

        let mut sources = Vec::new();
        while let Some(joined) = set.join_next().await {
            let Ok((candidate, resolved)) = joined else {
                warn!("audio candidate task failed to join, dropping");
                continue;
            };
            match resolved {
                Ok(path) => sources.push(AudioSource {
                    path,
                    start_time: candidate.start_time,
                    volume: candidate.volume,
                    trim_start: candidate.trim_start,
                    trim_end: candidate.trim_end,
                }),
                Err(reason) => {
                    warn!(
                        element = %candidate.element_name,
                        asset = %candidate.asset.id,
                        %reason,
                        "dropping audio source"
                    );
                }
            }
        }

        if cancel.is_cancelled() {
            // Never hand out descriptors assembled from a cancelled run.
            return Err(CoreError::Cancelled);
        }

        sources.sort_by(|a, b| {
            a.start_time
                .total_cmp(&b.start_time)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(sources)
    }
}

fn collect_candidates(resolver: &SourceResolver, timeline: &Timeline) -> Vec<AudioCandidate> {
    let mut candidates = Vec::new();

    for track in &timeline.tracks {
        if !track.is_audio_capable() || track.muted {
            continue;
        }
        for element in &track.elements {
            if element.hidden {
                continue;
            }
            let ElementKind::Media {
                asset_id,
                volume,
                muted,
            } = &element.kind
            else {
                continue;
            };
            if *muted {
                continue;
            }
            let Some(asset) = resolver.registry.get(asset_id) else {
                warn!(asset_id, "audio pass: stale asset reference, dropping");
                continue;
            };
            // Images never carry an audio stream.
            if !asset.kind.carries_audio() {
                continue;
            }
            candidates.push(AudioCandidate {
                element_name: element.name.clone(),
                asset,
                start_time: element.start_time,
                volume: *volume,
                trim_start: element.trim_start,
                trim_end: element.trim_end,
            });
        }
    }

    candidates
}

// =============================================================================
// Tests
// =============================================================================
