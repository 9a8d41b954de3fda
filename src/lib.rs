//! slotlock - Reversible Capability Revocation
//!
//! Disables individual operations on live objects of a managed runtime by
//! swapping the entry pointer stored in a dispatch slot for a stand-in that
//! always fails, and restores the original entry on demand.
//!
//! # Components
//! - Slot Registry: closed, versioned table of the dispatch slots that can be patched
//! - Patch Engine: installs and reverts single pointer swaps under a global write lock
//! - Lockdown Controller: process-wide freeze that blocks every further install/revert
//!
//! # Security Properties
//! - A revert never overwrites a slot whose value it does not recognize
//! - Every mutating operation is all-or-nothing
//! - Only the holder of the lockdown token can lift a lockdown
//!
//! # Host Contract
//! The embedding layer owns the object layout. It exposes dispatch slots as
//! [`SlotCell`]s through the [`host`] traits; this crate never computes byte
//! offsets into foreign memory.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod host;
pub mod lockdown;
pub mod patch;
pub mod slot;

pub use config::{EngineConfig, HostVersion};
pub use error::{ErrorKind, PatchError};
pub use host::{NativeFunction, SlotTable, TypeSlots};
pub use lockdown::{LockdownController, LockdownToken};
pub use patch::{PatchEngine, PatchHandle, PatchSet};
pub use slot::{
    Arity, Category, Convention, Placement, Protocols, Signature, SlotCell, SlotDescriptor,
    SlotRegistry,
};
