//! Lockdown Controller
//!
//! Two-state machine guarding every mutating engine call.
//!
//! ```text
//!            enter() -> token
//!   Unlocked ─────────────────► Locked(token id)
//!      ▲                            │
//!      └────────────────────────────┘
//!            exit(token)
//! ```
//!
//! A trusted bootstrap phase installs its patches, enters lockdown, and keeps
//! the token. From then on no install or revert succeeds anywhere in the
//! process, including from the code that installed the patches, until the
//! token is handed back.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use log::info;
use spin::Mutex;

use crate::error::{PatchError, PatchResult};
use crate::patch::engine::WRITE_LOCK;

/// Source of token identities, shared by every controller.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// The process-wide controller consulted by every patch engine.
static LOCKDOWN: LockdownController = LockdownController::new();

/// Proof of ownership of an active lockdown.
///
/// Returned by [`LockdownController::enter`] and consumed by
/// [`LockdownController::exit`]. Not `Clone`: exactly one party can release
/// the lockdown.
#[must_use = "dropping the token makes the lockdown permanent"]
pub struct LockdownToken {
    id: u64,
}

impl fmt::Debug for LockdownToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockdownToken(#{})", self.id)
    }
}

/// Single-owner freeze gate.
#[derive(Debug)]
pub struct LockdownController {
    /// Identity of the token that owns the current lockdown.
    owner: Mutex<Option<u64>>,
}

impl LockdownController {
    /// Create an unlocked controller.
    pub const fn new() -> Self {
        Self {
            owner: Mutex::new(None),
        }
    }

    /// The process-wide controller.
    #[inline]
    pub fn global() -> &'static Self {
        &LOCKDOWN
    }

    /// Engage lockdown and return the token that can lift it.
    ///
    /// Waits for any in-flight install or revert to finish first.
    ///
    /// Fails with `AlreadyLocked` if a lockdown is active.
    pub fn enter(&self) -> PatchResult<LockdownToken> {
        let _write = WRITE_LOCK.lock();
        let mut owner = self.owner.lock();
        if owner.is_some() {
            return Err(PatchError::AlreadyLocked);
        }

        let id = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        *owner = Some(id);
        info!("lockdown engaged (token #{id})");
        Ok(LockdownToken { id })
    }

    /// Lift the lockdown owned by `token`.
    ///
    /// Fails with `NoLockdown` if none is active, or `WrongOwner` if `token`
    /// belongs to a different (earlier) lockdown.
    pub fn exit(&self, token: LockdownToken) -> PatchResult<()> {
        let _write = WRITE_LOCK.lock();
        let mut owner = self.owner.lock();
        match *owner {
            None => Err(PatchError::NoLockdown),
            Some(id) if id != token.id => Err(PatchError::WrongOwner),
            Some(_) => {
                *owner = None;
                info!("lockdown lifted (token #{})", token.id);
                Ok(())
            }
        }
    }

    /// Check whether a lockdown is active.
    pub fn is_engaged(&self) -> bool {
        self.owner.lock().is_some()
    }

    /// Refuse with `LockedDown` if a lockdown is active.
    pub(crate) fn ensure_unlocked(&self) -> PatchResult<()> {
        if self.is_engaged() {
            Err(PatchError::LockedDown)
        } else {
            Ok(())
        }
    }
}

impl Default for LockdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_exit_cycle() {
        let controller = LockdownController::new();
        assert!(!controller.is_engaged());
        assert!(controller.ensure_unlocked().is_ok());

        let token = controller.enter().unwrap();
        assert!(controller.is_engaged());
        assert_eq!(controller.ensure_unlocked(), Err(PatchError::LockedDown));

        controller.exit(token).unwrap();
        assert!(!controller.is_engaged());

        // No terminal state: the controller can be engaged again.
        let token = controller.enter().unwrap();
        controller.exit(token).unwrap();
    }

    #[test]
    fn test_double_enter() {
        let controller = LockdownController::new();
        let token = controller.enter().unwrap();
        assert_eq!(controller.enter().unwrap_err(), PatchError::AlreadyLocked);
        controller.exit(token).unwrap();
    }

    #[test]
    fn test_exit_without_lockdown() {
        let controller = LockdownController::new();
        let token = controller.enter().unwrap();
        let other = LockdownController::new();
        assert_eq!(other.exit(token), Err(PatchError::NoLockdown));
        assert!(controller.is_engaged());
    }

    #[test]
    fn test_stale_token_is_wrong_owner() {
        let controller = LockdownController::new();
        let first = controller.enter().unwrap();

        let foreign = LockdownController::new();
        let stale = foreign.enter().unwrap();

        assert_eq!(controller.exit(stale), Err(PatchError::WrongOwner));
        assert!(controller.is_engaged());
        controller.exit(first).unwrap();
    }
}
