//! Cutline Core Engine
//!
//! Timeline editing core for a non-linear video editor: the timeline data
//! model and its invariants, the element operation engine (insert, remove,
//! move, split, trim, with simple and ripple variants), debounced project
//! persistence, and the export source-resolution pipeline that turns a
//! timeline snapshot into encoder-ready inputs and filter-chain
//! expressions.
//!
//! Rendering, encoding, and the editor surface are external collaborators;
//! this crate talks to them through the traits in [`assets`], [`export`],
//! and [`project`].

pub mod assets;
pub mod effects;
pub mod engine;
pub mod export;
pub mod project;
pub mod timeline;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
