//! Timeline Queries
//!
//! Read-only, invariant-preserving queries over the track list: active
//! elements at an instant, main-track lookup, render ordering, and the
//! element-kind / track-type compatibility table.

use crate::error::{CoreError, CoreResult};
use crate::timeline::{Element, ElementKindTag, Track, TrackKind};
use crate::types::TimeSec;

/// A non-hidden element active at a queried instant, paired with its track
#[derive(Clone, Copy, Debug)]
pub struct ActiveElement<'a> {
    pub element: &'a Element,
    pub track: &'a Track,
}

/// Returns every non-hidden element whose half-open interval contains
/// `time`, across all tracks. Output order is stable: track order first,
/// then element order within the track, so overlay z-ordering stays
/// deterministic.
pub fn active_elements_at(tracks: &[Track], time: TimeSec) -> Vec<ActiveElement<'_>> {
    tracks
        .iter()
        .flat_map(|track| {
            track
                .elements
                .iter()
                .filter(move |e| !e.hidden && e.contains_time(time))
                .map(move |element| ActiveElement { element, track })
        })
        .collect()
}

/// Returns the main track, if any
pub fn main_track(tracks: &[Track]) -> Option<&Track> {
    tracks.iter().find(|t| t.is_main)
}

/// Guarantees exactly one main track exists: if none does, an empty media
/// main track is synthesized and prepended. Idempotent.
pub fn ensure_main_track(tracks: &mut Vec<Track>) {
    if tracks.iter().any(|t| t.is_main) {
        return;
    }
    tracks.insert(0, Track::new_main("Main"));
}

/// Stable sort by the fixed type-priority table, with main tracks sorting
/// first within their type bucket. Element timing is untouched.
pub fn sort_tracks_by_order(tracks: &mut [Track]) {
    tracks.sort_by_key(|t| (t.kind.render_order(), !t.is_main));
}

/// The element-kind / track-type whitelist. Media elements may also sit on
/// audio tracks (detached audio uses a media element referencing an audio
/// asset); every other kind maps to its own track type.
pub fn can_element_go_on_track(element_kind: ElementKindTag, track_kind: TrackKind) -> bool {
    match element_kind {
        ElementKindTag::Media => matches!(track_kind, TrackKind::Media | TrackKind::Audio),
        ElementKindTag::Text => track_kind == TrackKind::Text,
        ElementKindTag::Sticker => track_kind == TrackKind::Sticker,
        ElementKindTag::Caption => track_kind == TrackKind::Captions,
        ElementKindTag::OverlayComposition => track_kind == TrackKind::OverlayComposition,
        ElementKindTag::RichText => track_kind == TrackKind::RichText,
    }
}

/// Validates kind compatibility, failing with `IncompatibleKind` instead of
/// silently clamping
pub fn validate_compatibility(element: &Element, track: &Track) -> CoreResult<()> {
    let element_kind = element.kind.tag();
    if can_element_go_on_track(element_kind, track.kind) {
        Ok(())
    } else {
        Err(CoreError::IncompatibleKind {
            element_kind,
            track_kind: track.kind,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::ElementKind;

    fn media_element(start: f64, duration: f64) -> Element {
        Element::new(
            "clip",
            duration,
            start,
            ElementKind::Media {
                asset_id: "asset".to_string(),
                volume: 1.0,
                muted: false,
            },
        )
    }

    fn text_element(start: f64, duration: f64) -> Element {
        Element::new(
            "title",
            duration,
            start,
            ElementKind::Text {
                text: "Hello".to_string(),
                font_family: "Inter".to_string(),
                font_size: 48.0,
                color: "#ffffff".to_string(),
            },
        )
    }

    #[test]
    fn test_active_elements_at_filters_and_orders() {
        let mut media = Track::new_main("Main");
        media.elements.push(media_element(0.0, 10.0));
        media.elements.push(media_element(10.0, 5.0));

        let mut text = Track::new("Text 1", TrackKind::Text);
        text.elements.push(text_element(2.0, 4.0));
        let mut hidden = text_element(0.0, 20.0);
        hidden.hidden = true;
        text.elements.push(hidden);

        let tracks = vec![media.clone(), text.clone()];
        let active = active_elements_at(&tracks, 3.0);

        assert_eq!(active.len(), 2);
        assert_eq!(active[0].track.id, media.id);
        assert_eq!(active[1].track.id, text.id);

        // Half-open interval: nothing is active exactly at an end boundary
        // except the successor that begins there.
        let at_boundary = active_elements_at(&tracks, 10.0);
        assert_eq!(at_boundary.len(), 1);
        assert_eq!(at_boundary[0].element.start_time, 10.0);
    }

    #[test]
    fn test_active_elements_is_deterministic() {
        let mut track = Track::new_main("Main");
        track.elements.push(media_element(0.0, 10.0));
        let tracks = vec![track];

        let first: Vec<String> = active_elements_at(&tracks, 1.0)
            .iter()
            .map(|a| a.element.id.clone())
            .collect();
        let second: Vec<String> = active_elements_at(&tracks, 1.0)
            .iter()
            .map(|a| a.element.id.clone())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_main_track_synthesizes_and_is_idempotent() {
        let mut tracks = vec![Track::new("Audio 1", TrackKind::Audio)];

        ensure_main_track(&mut tracks);
        assert_eq!(tracks.len(), 2);
        assert!(tracks[0].is_main);
        assert_eq!(tracks[0].kind, TrackKind::Media);

        let snapshot = tracks.clone();
        ensure_main_track(&mut tracks);
        assert_eq!(tracks, snapshot);
        assert_eq!(tracks.iter().filter(|t| t.is_main).count(), 1);
    }

    #[test]
    fn test_sort_tracks_by_order() {
        let audio = Track::new("Audio 1", TrackKind::Audio);
        let media = Track::new("Media 2", TrackKind::Media);
        let main = Track::new_main("Main");
        let text = Track::new("Text 1", TrackKind::Text);
        let sticker = Track::new("Stickers", TrackKind::Sticker);

        let mut tracks = vec![audio, media, main, text, sticker];
        sort_tracks_by_order(&mut tracks);

        let kinds: Vec<TrackKind> = tracks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TrackKind::Text,
                TrackKind::Sticker,
                TrackKind::Media,
                TrackKind::Media,
                TrackKind::Audio,
            ]
        );
        // Main track sorts first within the media bucket
        assert!(tracks[2].is_main);
    }

    #[test]
    fn test_compatibility_whitelist() {
        assert!(can_element_go_on_track(
            ElementKindTag::Media,
            TrackKind::Media
        ));
        assert!(can_element_go_on_track(
            ElementKindTag::Media,
            TrackKind::Audio
        ));
        assert!(!can_element_go_on_track(
            ElementKindTag::Sticker,
            TrackKind::Media
        ));
        assert!(can_element_go_on_track(
            ElementKindTag::Sticker,
            TrackKind::Sticker
        ));
        assert!(!can_element_go_on_track(
            ElementKindTag::Text,
            TrackKind::Captions
        ));
    }

    #[test]
    fn test_validate_compatibility_error() {
        let track = Track::new("Stickers", TrackKind::Sticker);
        let element = text_element(0.0, 2.0);

        let err = validate_compatibility(&element, &track).unwrap_err();
        assert!(matches!(err, CoreError::IncompatibleKind { .. }));
    }
}
