//! Stand-in Entry Points
//!
//! Replacement functions installed into disabled slots. Each one signals the
//! host's "not implemented" condition and returns the failure value that the
//! host's call site expects for that slot's calling convention.
//!
//! # Conventions
//! ```text
//! ┌────────────┬──────────────────────────────┬──────────────┐
//! │ Convention │ Original return type         │ Failure value│
//! ├────────────┼──────────────────────────────┼──────────────┤
//! │ Object     │ reference-counted object ptr │ null         │
//! │ Status     │ C int                        │ -1           │
//! │ Size       │ pointer-sized signed integer │ -1           │
//! └────────────┴──────────────────────────────┴──────────────┘
//! ```
//!
//! Every argument is a pointer-sized word and is ignored. Stand-ins exist for
//! one to four arguments so that each slot gets a stand-in whose signature
//! matches the host's call exactly.

use core::ffi::{c_int, c_void};
use core::ptr;

use spin::RwLock;

use super::cell::Entry;

/// Message passed to the raise hook by every stand-in.
///
/// Independent of the engine label: one stand-in serves all engines.
pub const DISABLED_MESSAGE: &str = "function has been disabled";

/// Host callback that records a "not implemented" failure.
///
/// Called on the thread that invoked the disabled operation, before the
/// stand-in returns its failure value.
pub type RaiseHook = fn(&'static str);

static RAISE_HOOK: RwLock<Option<RaiseHook>> = RwLock::new(None);

/// Install the host's "not implemented" signaler.
///
/// Returns the previously installed hook.
pub fn set_raise_hook(hook: RaiseHook) -> Option<RaiseHook> {
    RAISE_HOOK.write().replace(hook)
}

/// Remove the raise hook. Stand-ins then fail silently with their sentinel.
pub fn clear_raise_hook() -> Option<RaiseHook> {
    RAISE_HOOK.write().take()
}

#[inline]
fn raise_not_implemented() {
    // Copy the hook out so it runs without the read lock held.
    let hook = *RAISE_HOOK.read();
    if let Some(hook) = hook {
        hook(DISABLED_MESSAGE);
    }
}

/// Return-value convention of a dispatch slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Convention {
    /// Returns an object reference; null signals failure.
    Object,
    /// Returns a C `int`; -1 signals failure.
    Status,
    /// Returns a pointer-sized signed integer (length, hash); -1 signals failure.
    Size,
}

/// Number of arguments the host passes to a slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Arity {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

/// Full calling signature of a dispatch slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Signature {
    pub convention: Convention,
    pub arity: Arity,
}

type Word = *mut c_void;

macro_rules! stand_ins {
    ($($name:ident($($arg:ty),+) -> $ret:ty = $fail:expr;)+) => {
        $(
            extern "C" fn $name($(_: $arg),+) -> $ret {
                raise_not_implemented();
                $fail
            }
        )+
    };
}

stand_ins! {
    object_1(Word) -> Word = ptr::null_mut();
    object_2(Word, Word) -> Word = ptr::null_mut();
    object_3(Word, Word, Word) -> Word = ptr::null_mut();
    object_4(Word, Word, Word, Word) -> Word = ptr::null_mut();
    status_1(Word) -> c_int = -1;
    status_2(Word, Word) -> c_int = -1;
    status_3(Word, Word, Word) -> c_int = -1;
    status_4(Word, Word, Word, Word) -> c_int = -1;
    size_1(Word) -> isize = -1;
    size_2(Word, Word) -> isize = -1;
    size_3(Word, Word, Word) -> isize = -1;
    size_4(Word, Word, Word, Word) -> isize = -1;
}

impl Signature {
    /// Create a signature.
    pub const fn new(convention: Convention, arity: Arity) -> Self {
        Self { convention, arity }
    }

    /// Shorthand for an object-returning signature.
    pub const fn object(arity: Arity) -> Self {
        Self::new(Convention::Object, arity)
    }

    /// Shorthand for an int-status signature.
    pub const fn status(arity: Arity) -> Self {
        Self::new(Convention::Status, arity)
    }

    /// Shorthand for a size/hash signature.
    pub const fn size(arity: Arity) -> Self {
        Self::new(Convention::Size, arity)
    }

    /// Entry point of the stand-in matching this signature.
    pub fn stand_in(self) -> Entry {
        use Arity::*;
        use Convention::*;

        match (self.convention, self.arity) {
            (Object, One) => object_1 as Entry,
            (Object, Two) => object_2 as Entry,
            (Object, Three) => object_3 as Entry,
            (Object, Four) => object_4 as Entry,
            (Status, One) => status_1 as Entry,
            (Status, Two) => status_2 as Entry,
            (Status, Three) => status_3 as Entry,
            (Status, Four) => status_4 as Entry,
            (Size, One) => size_1 as Entry,
            (Size, Two) => size_2 as Entry,
            (Size, Three) => size_3 as Entry,
            (Size, Four) => size_4 as Entry,
        }
    }
}

/// Check whether `entry` is one of the stand-ins.
pub fn is_stand_in(entry: Entry) -> bool {
    const ALL: [Convention; 3] = [Convention::Object, Convention::Status, Convention::Size];
    const ARITIES: [Arity; 4] = [Arity::One, Arity::Two, Arity::Three, Arity::Four];

    !entry.is_null()
        && ALL.iter().any(|&convention| {
            ARITIES
                .iter()
                .any(|&arity| Signature::new(convention, arity).stand_in() == entry)
        })
}
