//! Timeline Data Model
//!
//! Tracks, elements, interval arithmetic and invariant-preserving queries.

mod models;
pub use models::*;

pub mod interval;

mod queries;
pub use queries::*;
