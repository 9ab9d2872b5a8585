//! Cutline Error Definitions
//!
//! Defines error types used throughout the crate. Stale track/element id
//! references are not errors: the engine treats them as silent no-ops
//! (`Ok(None)`), so no variant exists for them.

use thiserror::Error;

use crate::timeline::{ElementKindTag, TrackKind};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Validation Errors (hard failures, reported to the caller)
    // =========================================================================
    #[error("Element kind {element_kind:?} is not allowed on {track_kind:?} tracks")]
    IncompatibleKind {
        element_kind: ElementKindTag,
        track_kind: TrackKind,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Export Errors
    // =========================================================================
    #[error("Source resolution failed: {0}")]
    Resolution(String),

    #[error("Export cancelled")]
    Cancelled,

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    #[error("Failed to persist timeline: {0}")]
    Persistence(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
