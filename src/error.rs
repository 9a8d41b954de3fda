//! Error Types
//!
//! One error type covers the whole engine. Every failure is synchronous and
//! leaves all slots exactly as they were before the call.

use alloc::string::String;

use thiserror::Error;

/// Structured failure kind, for hosts that map errors onto their own
/// exception types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    LockedDown,
    AlreadyLocked,
    NoLockdown,
    WrongOwner,
    Corrupted,
    OutOfMemory,
}

/// Error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The host object does not expose what the call needs.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// No slot with this name exists for the configured host.
    #[error("no such slot: {0}")]
    NotFound(String),
    /// A lockdown is in effect.
    #[error("lockdown")]
    LockedDown,
    /// A lockdown is already in effect.
    #[error("already in lockdown")]
    AlreadyLocked,
    /// No lockdown to exit.
    #[error("no lockdown")]
    NoLockdown,
    /// The token does not belong to the active lockdown.
    #[error("lockdown token does not own the active lockdown")]
    WrongOwner,
    /// The slot no longer holds the value this handle installed.
    #[error("{slot} was modified after being {label}; refusing to restore")]
    Corrupted {
        slot: &'static str,
        label: &'static str,
    },
    /// The patch record could not be allocated.
    #[error("out of memory allocating patch record")]
    OutOfMemory,
}

impl PatchError {
    /// Structured kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::LockedDown => ErrorKind::LockedDown,
            Self::AlreadyLocked => ErrorKind::AlreadyLocked,
            Self::NoLockdown => ErrorKind::NoLockdown,
            Self::WrongOwner => ErrorKind::WrongOwner,
            Self::Corrupted { .. } => ErrorKind::Corrupted,
            Self::OutOfMemory => ErrorKind::OutOfMemory,
        }
    }
}

/// Result alias for engine operations.
pub type PatchResult<T> = Result<T, PatchError>;
