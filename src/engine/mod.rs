//! Element Operation Engine
//!
//! Mutating timeline operations: add, remove, move, split, trim, duplicate
//! and the flag toggles, each in a "simple" and (where it applies) a
//! "ripple" variant. Every operation is atomic from the caller's
//! perspective: it either fully applies or the timeline rolls back to the
//! pre-operation snapshot. Stale track/element ids are silent no-ops; only
//! kind/track incompatibility is a hard failure.

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::project::SaveScheduler;
use crate::timeline::{
    ensure_main_track, interval, validate_compatibility, Element, ElementKind, Timeline, Track,
    TrackKind, Transform,
};
use crate::types::{ElementId, TimeSec, TrackId};

// =============================================================================
// Element Spec
// =============================================================================

/// Blueprint for a new element. The engine assigns the id on insertion.
#[derive(Clone, Debug)]
pub struct ElementSpec {
    pub name: String,
    pub duration: TimeSec,
    pub start_time: TimeSec,
    pub trim_start: TimeSec,
    pub trim_end: TimeSec,
    pub hidden: bool,
    pub transform: Option<Transform>,
    pub kind: ElementKind,
}

impl ElementSpec {
    pub fn new(name: &str, duration: TimeSec, start_time: TimeSec, kind: ElementKind) -> Self {
        Self {
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

    pub fn with_trims(mut self, trim_start: TimeSec, trim_end: TimeSec) -> Self {
        self.trim_start = trim_start;
        self.trim_end = trim_end;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    fn build(self) -> Element {
        let mut element = Element::new(&self.name, self.duration, self.start_time, self.kind);
        element.trim_start = self.trim_start;
        element.trim_end = self.trim_end;
        element.hidden = self.hidden;
        element.transform = self.transform;
        element
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Callback invoked with the pre-mutation timeline before every mutating
/// operation, so the owner can push an undo snapshot.
pub type MutationHook = Box<dyn FnMut(&Timeline) + Send>;

/// Single-writer engine owning the timeline being edited.
///
/// Mutations run synchronously on the caller's thread; persistence is
/// handed off to an optional debounced [`SaveScheduler`].
pub struct TimelineEngine {
    timeline: Timeline,
    hook: Option<MutationHook>,
    scheduler: Option<SaveScheduler>,
}

impl TimelineEngine {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            hook: None,
            scheduler: None,
        }
    }

    /// Read access to the current timeline
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Registers the pre-mutation snapshot hook
    pub fn set_mutation_hook(&mut self, hook: MutationHook) {
        self.hook = Some(hook);
    }

    /// Attaches the debounced persistence scheduler
    pub fn attach_scheduler(&mut self, scheduler: SaveScheduler) {
        self.scheduler = Some(scheduler);
    }

    /// Runs a mutation atomically: the hook fires first, then `f` runs
    /// against the live timeline. On error the pre-operation snapshot is
    /// restored. On success empty non-main tracks are pruned (unless the
    /// mutation opted out), the main-track invariant is re-asserted, and a
    /// save is scheduled. `Ok(None)` from `f` means "stale id, no-op":
    /// nothing is pruned or persisted.
    fn mutate<T>(
        &mut self,
        prune: bool,
        f: impl FnOnce(&mut Timeline) -> CoreResult<Option<T>>,
    ) -> CoreResult<Option<T>> {
        if let Some(hook) = &mut self.hook {
            hook(&self.timeline);
        }

        let snapshot = self.timeline.clone();
        match f(&mut self.timeline) {
            Ok(Some(value)) => {
                if prune {
                    self.timeline
                        .tracks
                        .retain(|t| t.is_main || !t.elements.is_empty());
                }
                ensure_main_track(&mut self.timeline.tracks);
                self.timeline.touch();
                if let Some(scheduler) = &self.scheduler {
                    scheduler.schedule(self.timeline.clone());
                }
                Ok(Some(value))
            }
            Ok(None) => {
                self.timeline = snapshot;
                Ok(None)
            }
            Err(err) => {
                self.timeline = snapshot;
                Err(err)
            }
        }
    }

    // =========================================================================
    // Track operations
    // =========================================================================

    /// Adds an empty track. The track survives until the next mutation; if
    /// still empty and not main by then, the usual pruning removes it.
    pub fn add_track(&mut self, name: &str, kind: TrackKind) -> CoreResult<TrackId> {
        let track = Track::new(name, kind);
        let track_id = track.id.clone();
        self.mutate(false, |timeline| {
            timeline.tracks.push(track);
            Ok(Some(()))
        })?;
        Ok(track_id)
    }

    /// Flips a track's mute flag. Stale id is a no-op.
    pub fn toggle_track_mute(&mut self, track_id: &str) -> CoreResult<()> {
        self.mutate(false, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "toggle_track_mute: stale track id, skipping");
                return Ok(None);
            };
            track.muted = !track.muted;
            Ok(Some(()))
        })
        .map(|_| ())
    }

    // =========================================================================
    // Element operations
    // =========================================================================

    /// Adds a new element to a track. Fails hard when the element kind is
    /// not allowed on the track; a stale track id is a silent no-op.
    /// Returns the new element's id.
    pub fn add_element(
        &mut self,
        track_id: &str,
        spec: ElementSpec,
    ) -> CoreResult<Option<ElementId>> {
        if spec.duration - spec.trim_start - spec.trim_end < 0.0 {
            return Err(CoreError::ValidationError(
                "element trims exceed its duration".to_string(),
            ));
        }
        if !spec.start_time.is_finite() || spec.start_time < 0.0 {
            return Err(CoreError::ValidationError(
                "startTime must be finite and non-negative".to_string(),
            ));
        }

        self.mutate(false, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "add_element: stale track id, skipping");
                return Ok(None);
            };

            let element = spec.build();
            validate_compatibility(&element, track)?;

            let element_id = element.id.clone();
            track.elements.push(element);
            interval::sort_by_start(&mut track.elements);
            Ok(Some(element_id))
        })
    }

    /// Removes an element without shifting siblings
    pub fn remove_element(&mut self, track_id: &str, element_id: &str) -> CoreResult<()> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "remove_element: stale track id, skipping");
                return Ok(None);
            };
            let Some(pos) = track.elements.iter().position(|e| e.id == element_id) else {
                debug!(element_id, "remove_element: stale element id, skipping");
                return Ok(None);
            };
            track.elements.remove(pos);
            Ok(Some(()))
        })
        .map(|_| ())
    }

    /// Removes an element and ripple-shifts same-track downstream siblings
    /// left by the removed element's effective duration. Other tracks are
    /// untouched.
    pub fn remove_element_with_ripple(
        &mut self,
        track_id: &str,
        element_id: &str,
    ) -> CoreResult<()> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "remove_element_with_ripple: stale track id");
                return Ok(None);
            };
            let Some(pos) = track.elements.iter().position(|e| e.id == element_id) else {
                debug!(element_id, "remove_element_with_ripple: stale element id");
                return Ok(None);
            };

            let removed = track.elements.remove(pos);
            let removed_end = removed.end_time();
            let shift = removed.effective_duration();

            for sibling in &mut track.elements {
                if sibling.start_time >= removed_end {
                    sibling.start_time = (sibling.start_time - shift).max(0.0);
                }
            }

            // Guard against drift from the shift arithmetic.
            track.elements = interval::resolve_overlaps(std::mem::take(&mut track.elements));
            Ok(Some(()))
        })
        .map(|_| ())
    }

    /// Moves an element to another track with timing unchanged. No-op when
    /// source and destination are the same or an id is stale; fails hard on
    /// kind incompatibility with nothing moved.
    pub fn move_element_to_track(
        &mut self,
        from_track_id: &str,
        to_track_id: &str,
        element_id: &str,
    ) -> CoreResult<()> {
        if from_track_id == to_track_id {
            return Ok(());
        }

        self.mutate(true, |timeline| {
            let Some(from_idx) = timeline.tracks.iter().position(|t| t.id == from_track_id)
            else {
                debug!(from_track_id, "move_element_to_track: stale source track");
                return Ok(None);
            };
            let Some(to_idx) = timeline.tracks.iter().position(|t| t.id == to_track_id) else {
                debug!(to_track_id, "move_element_to_track: stale destination track");
                return Ok(None);
            };
            let Some(pos) = timeline.tracks[from_idx]
                .elements
                .iter()
                .position(|e| e.id == element_id)
            else {
                debug!(element_id, "move_element_to_track: stale element id");
                return Ok(None);
            };

            // Validate against the destination before touching anything.
            validate_compatibility(
                &timeline.tracks[from_idx].elements[pos],
                &timeline.tracks[to_idx],
            )?;

            let element = timeline.tracks[from_idx].elements.remove(pos);
            let dest = &mut timeline.tracks[to_idx];
            dest.elements.push(element);
            interval::sort_by_start(&mut dest.elements);
            Ok(Some(()))
        })
        .map(|_| ())
    }

    /// Sets an element's start time (clamped at 0) without shifting others.
    /// The caller is responsible for re-running overlap resolution if it
    /// allowed an overlapping drop.
    pub fn update_start_time(
        &mut self,
        track_id: &str,
        element_id: &str,
        new_start: TimeSec,
    ) -> CoreResult<()> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "update_start_time: stale track id, skipping");
                return Ok(None);
            };
            let Some(element) = track.element_mut(element_id) else {
                debug!(element_id, "update_start_time: stale element id, skipping");
                return Ok(None);
            };
            element.start_time = new_start.max(0.0);
            interval::sort_by_start(&mut track.elements);
            Ok(Some(()))
        })
        .map(|_| ())
    }

    /// Sets an element's start time and ripple-shifts same-track siblings.
    ///
    /// Moving later shifts every sibling whose start is at or past the old
    /// end by the same delta. Moving earlier shifts only siblings at or past
    /// both the new end and the old start; elements strictly between the old
    /// and new positions stay put. The boundary asymmetry between the two
    /// directions is intentional and load-bearing.
    pub fn update_start_time_with_ripple(
        &mut self,
        track_id: &str,
        element_id: &str,
        new_start: TimeSec,
    ) -> CoreResult<()> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "update_start_time_with_ripple: stale track id");
                return Ok(None);
            };
            let Some(element) = track.element(element_id) else {
                debug!(element_id, "update_start_time_with_ripple: stale element id");
                return Ok(None);
            };

            let new_start = new_start.max(0.0);
            let old_start = element.start_time;
            let old_end = element.end_time();
            let new_end = new_start + element.effective_duration();
            let delta = new_start - old_start;

            for sibling in &mut track.elements {
                if sibling.id == element_id {
                    sibling.start_time = new_start;
                    continue;
                }
                if delta > 0.0 {
                    if sibling.start_time >= old_end {
                        sibling.start_time += delta;
                    }
                } else if delta < 0.0
                    && sibling.start_time >= new_end
                    && sibling.start_time >= old_start
                {
                    sibling.start_time = (sibling.start_time + delta).max(0.0);
                }
            }

            track.elements = interval::resolve_overlaps(std::mem::take(&mut track.elements));
            Ok(Some(()))
        })
        .map(|_| ())
    }

    /// Splits an element at a timeline instant strictly inside its active
    /// interval, producing a sibling that continues the content where the
    /// first half stops. Returns the second element's id, or `None` when the
    /// split point is out of range.
    pub fn split_element(
        &mut self,
        track_id: &str,
        element_id: &str,
        at_time: TimeSec,
    ) -> CoreResult<Option<ElementId>> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "split_element: stale track id, skipping");
                return Ok(None);
            };
            let Some(pos) = track.elements.iter().position(|e| e.id == element_id) else {
                debug!(element_id, "split_element: stale element id, skipping");
                return Ok(None);
            };

            let original = &track.elements[pos];
            if at_time <= original.start_time || at_time >= original.end_time() {
                debug!(at_time, "split_element: split point outside element");
                return Ok(None);
            }

            let relative = at_time - original.start_time;

            let mut second = original.clone();
            second.id = ulid::Ulid::new().to_string();
            second.start_time = at_time;
            second.trim_start = original.trim_start + relative;
            let second_id = second.id.clone();

            let first = &mut track.elements[pos];
            first.trim_end = first.duration - first.trim_start - relative;

            track.elements.push(second);
            interval::sort_by_start(&mut track.elements);
            Ok(Some(second_id))
        })
    }

    /// Split that keeps only the portion before `at_time`
    pub fn split_keep_left(
        &mut self,
        track_id: &str,
        element_id: &str,
        at_time: TimeSec,
    ) -> CoreResult<bool> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                return Ok(None);
            };
            let Some(element) = track.element_mut(element_id) else {
                return Ok(None);
            };
            if at_time <= element.start_time || at_time >= element.end_time() {
                debug!(at_time, "split_keep_left: split point outside element");
                return Ok(None);
            }

            let relative = at_time - element.start_time;
            element.trim_end = element.duration - element.trim_start - relative;
            Ok(Some(()))
        })
        .map(|r| r.is_some())
    }

    /// Split that keeps only the portion at and after `at_time`
    pub fn split_keep_right(
        &mut self,
        track_id: &str,
        element_id: &str,
        at_time: TimeSec,
    ) -> CoreResult<bool> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                return Ok(None);
            };
            let Some(element) = track.element_mut(element_id) else {
                return Ok(None);
            };
            if at_time <= element.start_time || at_time >= element.end_time() {
                debug!(at_time, "split_keep_right: split point outside element");
                return Ok(None);
            }

            let relative = at_time - element.start_time;
            element.trim_start += relative;
            element.start_time = at_time;
            interval::sort_by_start(&mut track.elements);
            Ok(Some(()))
        })
        .map(|r| r.is_some())
    }

    /// Sets trim values directly. Siblings are not re-packed.
    pub fn trim_element(
        &mut self,
        track_id: &str,
        element_id: &str,
        trim_start: TimeSec,
        trim_end: TimeSec,
    ) -> CoreResult<()> {
        if trim_start < 0.0 || trim_end < 0.0 {
            return Err(CoreError::ValidationError(
                "trim values must be non-negative".to_string(),
            ));
        }

        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "trim_element: stale track id, skipping");
                return Ok(None);
            };
            let Some(element) = track.element_mut(element_id) else {
                debug!(element_id, "trim_element: stale element id, skipping");
                return Ok(None);
            };
            if element.duration - trim_start - trim_end < 0.0 {
                return Err(CoreError::ValidationError(
                    "element trims exceed its duration".to_string(),
                ));
            }
            element.trim_start = trim_start;
            element.trim_end = trim_end;
            Ok(Some(()))
        })
        .map(|_| ())
    }

    /// Duplicates an element onto the same track. The copy gets a fresh id
    /// and starts where the original ends; any resulting overlap with later
    /// siblings is resolved by the standard sort-and-pack rule.
    pub fn duplicate_element(
        &mut self,
        track_id: &str,
        element_id: &str,
    ) -> CoreResult<Option<ElementId>> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "duplicate_element: stale track id, skipping");
                return Ok(None);
            };
            let Some(original) = track.element(element_id) else {
                debug!(element_id, "duplicate_element: stale element id, skipping");
                return Ok(None);
            };

            let mut copy = original.clone();
            copy.id = ulid::Ulid::new().to_string();
            copy.name = format!("{} (copy)", original.name);
            copy.start_time = original.end_time();
            let copy_id = copy.id.clone();

            track.elements.push(copy);
            track.elements = interval::resolve_overlaps(std::mem::take(&mut track.elements));
            Ok(Some(copy_id))
        })
    }

    /// Flips an element's hidden flag. Stale ids are a no-op.
    pub fn toggle_element_hidden(&mut self, track_id: &str, element_id: &str) -> CoreResult<()> {
        self.mutate(false, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "toggle_element_hidden: stale track id, skipping");
                return Ok(None);
            };
            let Some(element) = track.element_mut(element_id) else {
                debug!(element_id, "toggle_element_hidden: stale element id");
                return Ok(None);
            };
            element.hidden = !element.hidden;
            Ok(Some(()))
        })
        .map(|_| ())
    }

    /// Re-runs overlap resolution on a single track. Callers use this after
    /// a sequence of simple (non-ripple) updates that may have introduced
    /// overlap.
    pub fn resolve_track_overlaps(&mut self, track_id: &str) -> CoreResult<()> {
        self.mutate(true, |timeline| {
            let Some(track) = timeline.track_mut(track_id) else {
                debug!(track_id, "resolve_track_overlaps: stale track id");
                return Ok(None);
            };
            track.elements = interval::resolve_overlaps(std::mem::take(&mut track.elements));
            Ok(Some(()))
        })
        .map(|_| ())
    }
}

// =============================================================================
// Tests
// =============================================================================
