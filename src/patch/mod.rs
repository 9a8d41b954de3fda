//! Patching
//!
//! Install and revert stand-ins on host dispatch slots.
//!
//! # Design
//! - `PatchEngine`: the mutating operations, all behind one global write lock
//! - `PatchHandle`: owned, single-use proof of one installed patch
//! - `PatchSet`: several handles installed and reverted as a unit

pub mod engine;
pub mod record;

pub use engine::PatchEngine;
pub use record::{PatchHandle, PatchSet, FUNCTION_ENTRY};
