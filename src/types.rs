//! Cutline Core Type Definitions
//!
//! Defines fundamental types used throughout the crate.

use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Asset unique identifier (ULID)
pub type AssetId = String;

/// Element unique identifier (ULID)
pub type ElementId = String;

/// Track unique identifier (ULID)
pub type TrackId = String;

/// Project unique identifier (ULID)
pub type ProjectId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

// =============================================================================
// Spatial Types
// =============================================================================

/// 2D size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: u32,
    pub height: u32,
}

impl Size2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
