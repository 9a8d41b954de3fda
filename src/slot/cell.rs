//! Dispatch Slot Cells
//!
//! A `SlotCell` is one mutable function-pointer field of the host object
//! model, viewed through an atomic so that the engine and the host can both
//! read it without tearing.
//!
//! # Layout
//! `SlotCell` is `#[repr(transparent)]` over `AtomicPtr<()>`, which has the
//! same size and alignment as a raw pointer. A host field declared as a plain
//! function pointer can therefore be reinterpreted in place with
//! [`SlotCell::from_ptr`].

use core::fmt;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Untyped entry point stored in a dispatch slot.
///
/// The engine only stores, loads and compares entries. It never calls them.
pub type Entry = *mut ();

/// One mutable dispatch slot owned by the host.
#[repr(transparent)]
pub struct SlotCell(AtomicPtr<()>);

impl SlotCell {
    /// Create a cell holding `entry`.
    #[inline]
    pub const fn new(entry: Entry) -> Self {
        Self(AtomicPtr::new(entry))
    }

    /// Create an empty cell (the host's "operation not provided" value).
    #[inline]
    pub const fn empty() -> Self {
        Self::new(ptr::null_mut())
    }

    /// View a raw host field as a cell.
    ///
    /// # Safety
    /// - `field` must be non-null, aligned, and valid for reads and writes for `'a`
    /// - every other access to the field during `'a` must be atomic or happen
    ///   on the thread that performs the engine call
    #[inline]
    pub unsafe fn from_ptr<'a>(field: *mut Entry) -> &'a Self {
        // SAFETY: caller upholds the validity requirements of AtomicPtr::from_ptr;
        // SlotCell is repr(transparent) over AtomicPtr<()>.
        unsafe { &*(AtomicPtr::from_ptr(field) as *const AtomicPtr<()> as *const Self) }
    }

    /// Read the current entry.
    #[inline]
    pub fn load(&self) -> Entry {
        self.0.load(Ordering::Acquire)
    }

    /// Overwrite the entry, returning the previous one.
    #[inline]
    pub fn swap(&self, entry: Entry) -> Entry {
        self.0.swap(entry, Ordering::AcqRel)
    }

    /// Store `new` only if the cell still holds `current`.
    ///
    /// Returns the value observed in the cell on failure.
    #[inline]
    pub fn replace_if(&self, current: Entry, new: Entry) -> Result<(), Entry> {
        self.0
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    /// Set the entry unconditionally.
    ///
    /// Used by hosts to initialize or reassign their own slots.
    #[inline]
    pub fn store(&self, entry: Entry) {
        self.0.store(entry, Ordering::Release);
    }

    /// Check whether the slot is unset.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.load().is_null()
    }
}

impl Default for SlotCell {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for SlotCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotCell({:p})", self.load())
    }
}
