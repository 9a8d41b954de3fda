//! Engine Configuration
//!
//! Compile-time style configuration for a [`PatchEngine`](crate::PatchEngine).
//! There is no file or environment layer: the embedding layer builds an
//! `EngineConfig` and hands it to the engine.

use core::fmt;

/// Version of the host object model the slot table is matched against.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct HostVersion {
    pub major: u8,
    pub minor: u8,
}

impl HostVersion {
    /// Newest host layout the slot table describes.
    pub const LATEST: Self = Self::new(3, 13);

    /// Create a host version.
    #[inline]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for HostVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Label used when none is configured.
pub const DEFAULT_LABEL: &str = "disabled";

/// Configuration for one patch engine.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EngineConfig {
    /// Past-tense verb naming what the engine does to a slot ("disabled",
    /// "revoked", ...). Appears in log lines and error messages.
    ///
    /// Stand-ins are shared by every engine, so the message they raise is
    /// always [`DISABLED_MESSAGE`](crate::slot::DISABLED_MESSAGE) whatever
    /// the label.
    pub label: &'static str,
    /// Host version selecting the available slots.
    pub host: HostVersion,
}

impl EngineConfig {
    /// Default configuration: label "disabled", newest host layout.
    pub const fn new() -> Self {
        Self {
            label: DEFAULT_LABEL,
            host: HostVersion::LATEST,
        }
    }

    /// Replace the label.
    pub const fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Replace the host version.
    pub const fn with_host(mut self, host: HostVersion) -> Self {
        self.host = host;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
