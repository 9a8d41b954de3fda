//! Host Object Model Contract
//!
//! The embedding layer implements these traits to expose its dispatch slots
//! as [`SlotCell`]s. The engine reaches slots only through them, so the
//! foreign layout (field offsets, table pointers) stays on the host side.
//!
//! # Two-level indirection
//! ```text
//! type descriptor ──┬── inline slots (tp_repr, tp_call, ...)
//!                   ├── number table   ──► nb_add, nb_bool, ...
//!                   ├── sequence table ──► sq_length, sq_item, ...
//!                   ├── mapping table  ──► mp_subscript, ...
//!                   ├── async table    ──► am_await, ...
//!                   └── buffer table   ──► bf_getbuffer
//! ```

use crate::slot::{Arity, Category, SlotCell};

/// A per-category operation table reached through a type descriptor.
pub trait SlotTable {
    /// Cell for the slot called `name`, if this table has one.
    fn slot(&self, name: &str) -> Option<&SlotCell>;
}

/// A type descriptor exposing its dispatch slots.
pub trait TypeSlots {
    /// Cell for an inline slot called `name`.
    fn inline_slot(&self, name: &str) -> Option<&SlotCell>;

    /// The secondary table for `category`, or `None` if the type has none.
    fn table(&self, category: Category) -> Option<&dyn SlotTable>;
}

/// A native function object with a mutable entry point.
pub trait NativeFunction {
    /// Cell holding the function's native entry point.
    fn entry(&self) -> &SlotCell;

    /// Number of arguments the host passes to the entry point.
    ///
    /// Defaults to the plain (self, args) convention.
    fn arity(&self) -> Arity {
        Arity::Two
    }
}
