//! Dispatch Slots
//!
//! Everything the engine knows about the slots it patches.
//!
//! # Design
//! - `SlotCell`: one host-owned function-pointer field, accessed atomically
//! - Stand-ins: failing replacements, one per calling signature
//! - `SlotRegistry`: static table of patchable slots for a host version

pub mod cell;
pub mod registry;
pub mod stand_in;

pub use cell::{Entry, SlotCell};
pub use registry::{Category, Placement, Protocols, SlotDescriptor, SlotRegistry};
pub use stand_in::{
    clear_raise_hook, is_stand_in, set_raise_hook, Arity, Convention, RaiseHook, Signature,
    DISABLED_MESSAGE,
};
