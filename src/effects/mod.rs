//! Effect Parameter Translation
//!
//! Normalized visual-effect parameters and their translation into the
//! encoder's filter-chain expression language.

mod filter_builder;

pub use filter_builder::EffectParams;
