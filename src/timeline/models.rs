//! Timeline Model Definitions
//!
//! Defines Timeline, Track, Element and related types. Tracks hold their
//! elements directly (denormalized) so a timeline snapshot serializes as a
//! single self-contained document.

use serde::{Deserialize, Serialize};

use crate::types::{AssetId, ElementId, TimeSec, TrackId};

// =============================================================================
// Canvas
// =============================================================================

/// Output canvas size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

// =============================================================================
// Track
// =============================================================================

/// Track type/kind enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Media,
    Text,
    Audio,
    Sticker,
    Captions,
    OverlayComposition,
    RichText,
}

impl TrackKind {
    /// Compositing priority bucket: lower sorts first (drawn on top).
    /// Text-like tracks sit above overlay tracks, overlays above media,
    /// media above audio. Priority never affects timing.
    pub fn render_order(&self) -> u8 {
        match self {
            TrackKind::Text => 0,
            TrackKind::RichText => 1,
            TrackKind::Captions => 2,
            TrackKind::Sticker => 3,
            TrackKind::OverlayComposition => 4,
            TrackKind::Media => 5,
            TrackKind::Audio => 6,
        }
    }
}

/// Track (ordered lane of non-overlapping elements)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    /// Elements stored directly, kept ordered by start time
    pub elements: Vec<Element>,
    pub muted: bool,
    /// Exactly one track per timeline carries this flag
    pub is_main: bool,
}

impl Track {
    /// Creates a new track with the given name and kind
    pub fn new(name: &str, kind: TrackKind) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            kind,
            elements: vec![],
            muted: false,
            is_main: false,
        }
    }

    /// Creates the main media track
    pub fn new_main(name: &str) -> Self {
        Self {
            is_main: true,
            ..Self::new(name, TrackKind::Media)
        }
    }

    /// Gets an element by ID
    pub fn element(&self, element_id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == element_id)
    }

    /// Gets a mutable element by ID
    pub fn element_mut(&mut self, element_id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == element_id)
    }

    /// Returns true if this track can carry audio-bearing elements
    pub fn is_audio_capable(&self) -> bool {
        matches!(self.kind, TrackKind::Media | TrackKind::Audio)
    }
}

// =============================================================================
// Transform
// =============================================================================

/// Optional 2D spatial transform for an element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees
    pub rotation_deg: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            rotation_deg: 0.0,
        }
    }
}

// =============================================================================
// Overlay Placement
// =============================================================================

/// Percentage-based placement shared by sticker and overlay-composition
/// elements. Position is the center point; 50/50 is canvas center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPlacement {
    /// Center X as a percentage of canvas width (0-100)
    pub x_pct: f64,
    /// Center Y as a percentage of canvas height (0-100)
    pub y_pct: f64,
    /// Width as a percentage of canvas width (0-100)
    pub width_pct: f64,
    /// Height as a percentage of canvas height (0-100)
    pub height_pct: f64,
    pub z_index: i32,
    /// Opacity (0.0 - 1.0)
    pub opacity: f32,
    /// Rotation in degrees
    pub rotation_deg: f64,
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        Self {
            x_pct: 50.0,
            y_pct: 50.0,
            width_pct: 20.0,
            height_pct: 20.0,
            z_index: 0,
            opacity: 1.0,
            rotation_deg: 0.0,
        }
    }
}

// =============================================================================
// Element
// =============================================================================

/// Kind-specific element payload.
///
/// A closed sum type: every track-compatible kind has exactly one case, and
/// dispatch over kinds is exhaustive by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ElementKind {
    Media {
        asset_id: AssetId,
        /// Linear volume (1.0 = 100%)
        volume: f32,
        muted: bool,
    },
    Text {
        text: String,
        font_family: String,
        font_size: f32,
        /// CSS-style color string (e.g. "#ffffff")
        color: String,
    },
    Sticker {
        asset_id: AssetId,
        placement: OverlayPlacement,
    },
    Caption {
        text: String,
        /// BCP-47 language tag
        language: String,
        /// Recognition confidence (0.0 - 1.0)
        confidence: f32,
    },
    OverlayComposition {
        asset_id: AssetId,
        placement: OverlayPlacement,
    },
    RichText {
        /// Serialized rich-text document
        content: String,
    },
}

/// Discriminant-only view of [`ElementKind`], used for compatibility checks
/// and error reporting without cloning payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKindTag {
    Media,
    Text,
    Sticker,
    Caption,
    OverlayComposition,
    RichText,
}

impl ElementKind {
    pub fn tag(&self) -> ElementKindTag {
        match self {
            ElementKind::Media { .. } => ElementKindTag::Media,
            ElementKind::Text { .. } => ElementKindTag::Text,
            ElementKind::Sticker { .. } => ElementKindTag::Sticker,
            ElementKind::Caption { .. } => ElementKindTag::Caption,
            ElementKind::OverlayComposition { .. } => ElementKindTag::OverlayComposition,
            ElementKind::RichText { .. } => ElementKindTag::RichText,
        }
    }
}

/// Element (time-bounded unit on a track)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    /// Untrimmed content duration in seconds
    pub duration: TimeSec,
    /// Start position on the timeline in seconds
    pub start_time: TimeSec,
    /// Seconds trimmed off the head of the content
    pub trim_start: TimeSec,
    /// Seconds trimmed off the tail of the content
    pub trim_end: TimeSec,
    pub hidden: bool,
    /// Optional spatial transform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    pub kind: ElementKind,
}

impl Element {
    /// Creates a new element with a fresh id and zero trims
    pub fn new(name: &str, duration: TimeSec, start_time: TimeSec, kind: ElementKind) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            duration,
            start_time,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            transform: None,
            kind,
        }
    }

    /// On-timeline length after trimming
    pub fn effective_duration(&self) -> TimeSec {
        self.duration - self.trim_start - self.trim_end
    }

    /// Timeline end position (exclusive)
    pub fn end_time(&self) -> TimeSec {
        self.start_time + self.effective_duration()
    }

    /// Checks whether a timeline instant falls inside the half-open
    /// interval `[start_time, end_time)`
    pub fn contains_time(&self, time_sec: TimeSec) -> bool {
        time_sec >= self.start_time && time_sec < self.end_time()
    }

    /// Referenced asset id, for kinds that are asset-backed
    pub fn asset_id(&self) -> Option<&AssetId> {
        match &self.kind {
            ElementKind::Media { asset_id, .. }
            | ElementKind::Sticker { asset_id, .. }
            | ElementKind::OverlayComposition { asset_id, .. } => Some(asset_id),
            ElementKind::Text { .. }
            | ElementKind::Caption { .. }
            | ElementKind::RichText { .. } => None,
        }
    }
}

// =============================================================================
// Timeline
// =============================================================================

/// Timeline (top-level edit document)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub id: String,
    pub name: String,
    pub canvas: Canvas,
    pub tracks: Vec<Track>,
    pub created_at: String,
    pub modified_at: String,
}

impl Timeline {
    /// Creates a new timeline with a single empty main track
    pub fn new(name: &str, canvas: Canvas) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            canvas,
            tracks: vec![Track::new_main("Main")],
            created_at: now.clone(),
            modified_at: now,
        }
    }

    /// Gets a track by ID
    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    /// Gets a mutable track by ID
    pub fn track_mut(&mut self, track_id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// Total duration: the latest element end across all tracks
    pub fn total_duration(&self) -> TimeSec {
        self.tracks
            .iter()
            .flat_map(|t| t.elements.iter())
            .map(|e| e.end_time())
            .fold(0.0, f64::max)
    }

    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn media_element(start: TimeSec, duration: TimeSec) -> Element {
        Element::new(
            "clip",
            duration,
            start,
            ElementKind::Media {
                asset_id: "asset_1".to_string(),
                volume: 1.0,
                muted: false,
            },
        )
    }

    #[test]
    fn test_timeline_creation_has_main_track() {
        let timeline = Timeline::new("Project", Canvas::default());

        assert!(!timeline.id.is_empty());
        assert_eq!(timeline.tracks.len(), 1);
        assert!(timeline.tracks[0].is_main);
        assert_eq!(timeline.tracks[0].kind, TrackKind::Media);
    }

    #[test]
    fn test_effective_duration_and_end_time() {
        let mut element = media_element(2.0, 10.0);
        element.trim_start = 1.0;
        element.trim_end = 2.5;

        assert_eq!(element.effective_duration(), 6.5);
        assert_eq!(element.end_time(), 8.5);
    }

    #[test]
    fn test_contains_time_half_open() {
        let element = media_element(5.0, 4.0);

        assert!(element.contains_time(5.0));
        assert!(element.contains_time(8.999));
        assert!(!element.contains_time(9.0));
        assert!(!element.contains_time(4.999));
    }

    #[test]
    fn test_total_duration() {
        let mut timeline = Timeline::new("Project", Canvas::default());
        timeline.tracks[0].elements.push(media_element(0.0, 10.0));

        let mut audio = Track::new("Audio 1", TrackKind::Audio);
        audio.elements.push(media_element(8.0, 7.0));
        timeline.tracks.push(audio);

        assert_eq!(timeline.total_duration(), 15.0);
    }

    #[test]
    fn test_render_order_buckets() {
        assert!(TrackKind::Text.render_order() < TrackKind::Sticker.render_order());
        assert!(TrackKind::Sticker.render_order() < TrackKind::Media.render_order());
        assert!(TrackKind::Media.render_order() < TrackKind::Audio.render_order());
    }

    #[test]
    fn test_element_serialization_round_trip() {
        let mut element = media_element(1.0, 10.0);
        element.transform = Some(Transform::default());

        let json = serde_json::to_string(&element).unwrap();
        let parsed: Element = serde_json::from_str(&json).unwrap();

        assert_eq!(element, parsed);
    }

    #[test]
    fn test_timeline_serialization_round_trip() {
        let mut timeline = Timeline::new("Project", Canvas::new(1080, 1920));
        timeline.tracks[0].elements.push(media_element(0.0, 5.0));

        let mut stickers = Track::new("Stickers", TrackKind::Sticker);
        stickers.elements.push(Element::new(
            "star",
            3.0,
            1.0,
            ElementKind::Sticker {
                asset_id: "asset_2".to_string(),
                placement: OverlayPlacement::default(),
            },
        ));
        timeline.tracks.push(stickers);

        let json = serde_json::to_string(&timeline).unwrap();
        let parsed: Timeline = serde_json::from_str(&json).unwrap();
        let json_again = serde_json::to_string(&parsed).unwrap();

        assert_eq!(timeline, parsed);
        assert_eq!(json, json_again);
    }
}
