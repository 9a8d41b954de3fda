//! Lockdown
//!
//! Process-wide freeze for the patch engine.
//!
//! # Security Properties
//! - At most one lockdown is active at a time
//! - Only the token returned by `enter` can end it
//! - Tokens cannot be forged, cloned, or reused across lockdowns

pub mod controller;

pub use controller::{LockdownController, LockdownToken};
