//! Patch Engine
//!
//! Installs and reverts pointer swaps on host dispatch slots.
//!
//! # Locking
//! - Every install and revert first consults the process-wide lockdown
//!   controller, then takes the global write lock for the read-compare-write
//! - Lockdown is checked again under the write lock, and entering or lifting
//!   a lockdown takes the same lock, so no swap lands after `enter` returns
//! - One write lock serializes all slots; patching happens at hardening time,
//!   not on a hot path
//! - Writes by the host itself, outside the engine, are not serialized
//!
//! # Failure Atomicity
//! All checks and allocations happen before the swap. A failed call leaves
//! every slot untouched.

use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use log::{debug, warn};
use spin::Mutex;

use super::record::{PatchHandle, PatchRecord, PatchSet, FUNCTION_ENTRY};
use crate::config::EngineConfig;
use crate::error::{PatchError, PatchResult};
use crate::host::{NativeFunction, TypeSlots};
use crate::lockdown::{LockdownController, LockdownToken};
use crate::slot::{
    is_stand_in, Entry, Placement, Protocols, Signature, SlotCell, SlotDescriptor, SlotRegistry,
};

/// Global write lock shared by every engine and the lockdown controller.
pub(crate) static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Reversible slot patcher.
///
/// Engines are cheap values: the write lock and the lockdown state are
/// process-wide, so two engines with different labels still serialize
/// against each other.
#[derive(Debug, Clone, Copy)]
pub struct PatchEngine {
    config: EngineConfig,
    registry: SlotRegistry,
}

impl PatchEngine {
    /// Create an engine for `config`.
    pub const fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: SlotRegistry::new(config.host),
        }
    }

    /// Configuration this engine was built with.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Slots this engine can patch.
    #[inline]
    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    #[inline]
    fn lockdown(&self) -> &'static LockdownController {
        LockdownController::global()
    }

    /// Replace a native function's entry point with the object stand-in.
    pub fn install_function_patch<'a, F>(&self, function: &'a F) -> PatchResult<PatchHandle<'a>>
    where
        F: NativeFunction + ?Sized,
    {
        let stand_in = Signature::object(function.arity()).stand_in();
        self.install(function.entry(), FUNCTION_ENTRY, stand_in)
    }

    /// Replace the slot called `name` on `ty` with its stand-in.
    ///
    /// # Errors
    /// - `NotFound`: `name` is not a slot on the configured host
    /// - `InvalidArgument`: `ty` does not expose the slot or its table
    /// - `LockedDown`: a lockdown is active
    /// - `OutOfMemory`: the patch record could not be allocated
    pub fn install_slot_patch<'a, T>(&self, ty: &'a T, name: &str) -> PatchResult<PatchHandle<'a>>
    where
        T: TypeSlots + ?Sized,
    {
        let slot = self.resolve(name)?;
        let cell = locate(ty, slot)?;
        self.install(cell, slot.name, slot.signature.stand_in())
    }

    /// Patch every slot of `protocols` that `ty` exposes, as one unit.
    ///
    /// Slots whose table or field the type lacks are skipped. Either every
    /// exposed slot is patched or none is.
    pub fn install_protocol_patches<'a, T>(
        &self,
        ty: &'a T,
        protocols: Protocols,
    ) -> PatchResult<PatchSet<'a>>
    where
        T: TypeSlots + ?Sized,
    {
        self.lockdown().ensure_unlocked()?;

        let mut targets: Vec<(&'static SlotDescriptor, &'a SlotCell)> = Vec::new();
        targets
            .try_reserve_exact(self.registry.in_protocols(protocols).count())
            .map_err(|_| PatchError::OutOfMemory)?;
        targets.extend(
            self.registry
                .in_protocols(protocols)
                .filter_map(|slot| locate(ty, slot).ok().map(|cell| (slot, cell))),
        );

        let mut records = Vec::new();
        records
            .try_reserve_exact(targets.len())
            .map_err(|_| PatchError::OutOfMemory)?;
        for &(slot, cell) in &targets {
            records.push(PatchRecord::allocate(cell, slot.name, slot.signature.stand_in())?);
        }
        let mut set = PatchSet::with_capacity(records.len())?;

        {
            let _guard = WRITE_LOCK.lock();
            self.lockdown().ensure_unlocked()?;
            for record in &mut records {
                record.original = record.cell.swap(record.installed);
            }
        }

        debug!(
            "{} {} slots for protocols {:?}",
            self.config.label,
            records.len(),
            protocols
        );
        for record in records {
            set.push(PatchHandle::new(record, self.config.label));
        }
        Ok(set)
    }

    /// Restore the entry that `handle` replaced.
    ///
    /// # Errors
    /// - `LockedDown`: a lockdown is active
    /// - `Corrupted`: the slot no longer holds the stand-in this handle
    ///   installed (modified by someone else, or already reverted); nothing
    ///   is written
    pub fn revert(&self, handle: &PatchHandle<'_>) -> PatchResult<()> {
        self.lockdown().ensure_unlocked()?;

        let record = handle.record();
        let restored = {
            let _guard = WRITE_LOCK.lock();
            self.lockdown().ensure_unlocked()?;
            record.cell.replace_if(record.installed, record.original)
        };

        match restored {
            Ok(()) => {
                debug!("{} restored (was {})", record.slot, handle.label());
                Ok(())
            }
            Err(found) => {
                warn!(
                    "{} holds {:p}, expected {:p}; not restoring",
                    record.slot, found, record.installed
                );
                Err(PatchError::Corrupted {
                    slot: record.slot,
                    label: handle.label(),
                })
            }
        }
    }

    /// Restore every patch in `set`, newest first.
    ///
    /// All members are checked before anything is written; if any slot was
    /// modified the call fails with `Corrupted` and no slot changes.
    pub fn revert_set(&self, set: &PatchSet<'_>) -> PatchResult<()> {
        self.lockdown().ensure_unlocked()?;

        let _guard = WRITE_LOCK.lock();
        self.lockdown().ensure_unlocked()?;
        if let Some(stale) = set.handles().iter().find(|h| !h.record().is_current()) {
            warn!("{} was modified; not restoring set", stale.slot());
            return Err(PatchError::Corrupted {
                slot: stale.slot(),
                label: stale.label(),
            });
        }

        for handle in set.handles().iter().rev() {
            let record = handle.record();
            record.cell.store(record.original);
        }
        debug!("restored {} slots", set.len());
        Ok(())
    }

    /// Check whether the slot called `name` on `ty` currently holds a stand-in.
    pub fn is_disabled<T>(&self, ty: &T, name: &str) -> PatchResult<bool>
    where
        T: TypeSlots + ?Sized,
    {
        let slot = self.resolve(name)?;
        Ok(is_stand_in(locate(ty, slot)?.load()))
    }

    /// Engage the process-wide lockdown.
    pub fn enter_lockdown(&self) -> PatchResult<LockdownToken> {
        self.lockdown().enter()
    }

    /// Lift the process-wide lockdown owned by `token`.
    pub fn exit_lockdown(&self, token: LockdownToken) -> PatchResult<()> {
        self.lockdown().exit(token)
    }

    /// Check whether the process-wide lockdown is active.
    pub fn is_locked_down(&self) -> bool {
        self.lockdown().is_engaged()
    }

    fn resolve(&self, name: &str) -> PatchResult<&'static SlotDescriptor> {
        self.registry
            .resolve(name)
            .ok_or_else(|| PatchError::NotFound(name.to_string()))
    }

    fn install<'a>(
        &self,
        cell: &'a SlotCell,
        slot: &'static str,
        stand_in: Entry,
    ) -> PatchResult<PatchHandle<'a>> {
        self.lockdown().ensure_unlocked()?;

        let mut record = PatchRecord::allocate(cell, slot, stand_in)?;
        {
            let _guard = WRITE_LOCK.lock();
            self.lockdown().ensure_unlocked()?;
            record.original = cell.swap(stand_in);
        }

        debug!("{} {} (was {:p})", self.config.label, slot, record.original);
        Ok(PatchHandle::new(record, self.config.label))
    }
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Find the cell for `slot` on `ty`, following the category table if needed.
fn locate<'a, T>(ty: &'a T, slot: &SlotDescriptor) -> PatchResult<&'a SlotCell>
where
    T: TypeSlots + ?Sized,
{
    let cell = match slot.placement {
        Placement::Inline => ty.inline_slot(slot.name),
        Placement::Table(category) => {
            let table = ty.table(category).ok_or_else(|| {
                PatchError::InvalidArgument(format!(
                    "type has no {} table for {}",
                    category.name(),
                    slot.name
                ))
            })?;
            table.slot(slot.name)
        }
    };

    cell.ok_or_else(|| {
        PatchError::InvalidArgument(format!("type does not expose {}", slot.name))
    })
}
