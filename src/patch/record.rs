//! Patch Records and Handles
//!
//! A `PatchRecord` remembers one pointer swap: where it happened, what was
//! there before, and what was written. A `PatchHandle` owns exactly one
//! record and is the only way to undo the swap.
//!
//! # Lifetime
//! - The handle borrows the patched host object, so the object cannot be
//!   destroyed while a handle to it exists
//! - Dropping a handle frees its record and leaves the patch installed for
//!   the rest of the process; there is no implicit restore

use alloc::alloc::{self as heap, Layout};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use log::debug;

use crate::error::{PatchError, PatchResult};
use crate::slot::{Entry, SlotCell};

/// Name recorded for function entry-point patches.
pub const FUNCTION_ENTRY: &str = "<native function>";

/// State needed to reverse one swap.
pub(crate) struct PatchRecord<'a> {
    /// The patched cell.
    pub(crate) cell: &'a SlotCell,
    /// Slot name, for diagnostics.
    pub(crate) slot: &'static str,
    /// Value found in the cell before the swap.
    pub(crate) original: Entry,
    /// Value the swap wrote.
    pub(crate) installed: Entry,
}

// SAFETY: the entries are only stored and compared, never dereferenced or
// called by this crate; the cell itself is an atomic and already Sync.
unsafe impl Send for PatchRecord<'_> {}
// SAFETY: see above.
unsafe impl Sync for PatchRecord<'_> {}

impl<'a> PatchRecord<'a> {
    /// Allocate a record, reporting allocation failure instead of aborting.
    ///
    /// `original` is filled in by the engine at swap time.
    pub(crate) fn allocate(
        cell: &'a SlotCell,
        slot: &'static str,
        installed: Entry,
    ) -> PatchResult<Box<Self>> {
        let record = Self {
            cell,
            slot,
            original: core::ptr::null_mut(),
            installed,
        };

        let layout = Layout::new::<Self>();
        // SAFETY: PatchRecord is not zero-sized, so `layout` has non-zero size.
        let ptr = unsafe { heap::alloc(layout) } as *mut Self;
        if ptr.is_null() {
            return Err(PatchError::OutOfMemory);
        }

        // SAFETY: `ptr` was just allocated with the layout of `Self` by the
        // global allocator, which is what Box expects to free it with.
        unsafe {
            ptr.write(record);
            Ok(Box::from_raw(ptr))
        }
    }

    /// Check whether the cell still holds the value this record installed.
    #[inline]
    pub(crate) fn is_current(&self) -> bool {
        self.cell.load() == self.installed
    }
}

impl fmt::Debug for PatchRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PatchRecord({}, {:p} -> {:p})",
            self.slot, self.original, self.installed
        )
    }
}

/// Opaque, single-use handle to one installed patch.
///
/// Pass it to [`PatchEngine::revert`](crate::PatchEngine::revert) to restore
/// the original entry. A handle that is reverted a second time fails with
/// `Corrupted`, because the slot no longer holds the stand-in it installed.
#[must_use = "dropping the handle makes the patch permanent"]
pub struct PatchHandle<'a> {
    record: Box<PatchRecord<'a>>,
    label: &'static str,
}

impl<'a> PatchHandle<'a> {
    pub(crate) fn new(record: Box<PatchRecord<'a>>, label: &'static str) -> Self {
        Self { record, label }
    }

    pub(crate) fn record(&self) -> &PatchRecord<'a> {
        &self.record
    }

    /// Name of the patched slot.
    #[inline]
    pub fn slot(&self) -> &'static str {
        self.record.slot
    }

    /// Label of the engine that installed the patch.
    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Entry that was in the slot before the patch.
    #[inline]
    pub fn original(&self) -> Entry {
        self.record.original
    }

    /// Check whether the slot still holds this handle's stand-in.
    ///
    /// This is a racy check; only `revert` decides under the write lock.
    pub fn is_installed(&self) -> bool {
        self.record.is_current()
    }
}

impl fmt::Debug for PatchHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchHandle")
            .field("label", &self.label)
            .field("record", &self.record)
            .finish()
    }
}

impl Drop for PatchHandle<'_> {
    fn drop(&mut self) {
        if self.record.is_current() {
            debug!(
                "handle for {} dropped; patch stays {} permanently",
                self.record.slot, self.label
            );
        }
    }
}

/// A group of patches installed together.
///
/// Built by [`PatchEngine::install_protocol_patches`](crate::PatchEngine::install_protocol_patches)
/// and reverted as a unit by [`PatchEngine::revert_set`](crate::PatchEngine::revert_set).
#[derive(Debug)]
#[must_use = "dropping the set makes its patches permanent"]
pub struct PatchSet<'a> {
    handles: Vec<PatchHandle<'a>>,
}

impl<'a> PatchSet<'a> {
    /// Empty set with room for `capacity` handles.
    pub(crate) fn with_capacity(capacity: usize) -> PatchResult<Self> {
        let mut handles = Vec::new();
        handles
            .try_reserve_exact(capacity)
            .map_err(|_| PatchError::OutOfMemory)?;
        Ok(Self { handles })
    }

    /// Add a handle; capacity was reserved up front.
    pub(crate) fn push(&mut self, handle: PatchHandle<'a>) {
        debug_assert!(self.handles.len() < self.handles.capacity());
        self.handles.push(handle);
    }

    /// Handles in install order.
    pub fn handles(&self) -> &[PatchHandle<'a>] {
        &self.handles
    }

    /// Names of the patched slots, in install order.
    pub fn slots(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handles.iter().map(PatchHandle::slot)
    }

    /// Number of patches in the set.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check whether the set holds no patches.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Split the set into its individual handles.
    pub fn into_handles(self) -> Vec<PatchHandle<'a>> {
        self.handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn before() {}
    extern "C" fn after() {}

    #[test]
    fn test_record_tracks_installed_value() {
        let cell = SlotCell::new(before as Entry);
        let mut record = PatchRecord::allocate(&cell, "tp_repr", after as Entry).unwrap();
        record.original = cell.swap(record.installed);

        assert!(record.is_current());
        assert_eq!(record.original, before as Entry);

        cell.store(before as Entry);
        assert!(!record.is_current());
    }

    #[test]
    fn test_dropped_handle_leaves_patch() {
        let cell = SlotCell::new(before as Entry);
        let mut record = PatchRecord::allocate(&cell, "tp_str", after as Entry).unwrap();
        record.original = cell.swap(record.installed);

        let handle = PatchHandle::new(record, "disabled");
        assert_eq!(handle.slot(), "tp_str");
        assert!(handle.is_installed());
        drop(handle);

        assert_eq!(cell.load(), after as Entry);
    }

    #[test]
    fn test_set_capacity() {
        let set = PatchSet::with_capacity(4).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.slots().count(), 0);
    }
}
