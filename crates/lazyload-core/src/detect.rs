//! Capability detection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability probes offered by the execution environment.
pub trait Platform {
    /// The platform defers `loading="lazy"` images on its own.
    fn supports_native_lazy_loading(&self) -> bool;

    /// The platform can report element/viewport proximity.
    fn supports_viewport_observer(&self) -> bool;
}

/// Activation strategy for one page load.
///
/// Computed once at startup and never re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// The platform activates images itself; nothing to do
    Native,
    /// Placeholders, activated by proximity events
    Observer,
    /// Placeholders, all activated after a fixed delay
    TimedFallback,
}

impl Strategy {
    /// Whether this strategy swaps in placeholders.
    pub fn swaps_placeholders(self) -> bool {
        !matches!(self, Strategy::Native)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Observer => write!(f, "IntersectionObserver"),
            Self::TimedFallback => write!(f, "timed fallback"),
        }
    }
}

/// Pick the strategy for `platform`.
///
/// Native support wins even when an observer is also available, since the
/// platform must not be duplicated.
pub fn detect<P: Platform + ?Sized>(platform: &P) -> Strategy {
    if platform.supports_native_lazy_loading() {
        Strategy::Native
    } else if platform.supports_viewport_observer() {
        Strategy::Observer
    } else {
        Strategy::TimedFallback
    }
}
