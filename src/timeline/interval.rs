//! Interval Utilities
//!
//! Pure functions over element timeline intervals: overlap testing and the
//! deterministic sort-and-pack overlap resolution used after every mutation
//! that could introduce an overlap.

use crate::timeline::Element;

/// True if the half-open intervals `[a.start, a.end)` and `[b.start, b.end)`
/// intersect. Touching endpoints do not overlap.
pub fn overlaps(a: &Element, b: &Element) -> bool {
    a.start_time < b.end_time() && a.end_time() > b.start_time
}

/// True if any pair of elements in the slice overlaps
pub fn has_any_overlap(elements: &[Element]) -> bool {
    for (i, a) in elements.iter().enumerate() {
        for b in elements.iter().skip(i + 1) {
            if overlaps(a, b) {
                return true;
            }
        }
    }
    false
}

/// Sorts elements by start time, breaking ties by id so the packing order
/// stays deterministic when two elements share a start.
pub fn sort_by_start(elements: &mut [Element]) {
    elements.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Resolves overlaps with an order-preserving forward pack: after sorting by
/// start time, any element whose start falls before the previous element's
/// end is shifted forward to begin exactly at that end. Durations are never
/// changed and gaps are left alone.
pub fn resolve_overlaps(mut elements: Vec<Element>) -> Vec<Element> {
    sort_by_start(&mut elements);

    let mut prev_end: Option<f64> = None;
    for element in &mut elements {
        if let Some(end) = prev_end {
            if element.start_time < end {
                element.start_time = end;
            }
        }
        prev_end = Some(element.end_time());
    }

    elements
}

// =============================================================================
// Tests
// =============================================================================
