//! Boot-once gate shared by the wasm entry points.
//!
//! Booting always happens at structural readiness. A request made while
//! the document is still loading is parked until `DOMContentLoaded`; a
//! later request made before then replaces the parked one. Once booted,
//! every further request is refused.

use anyhow::{bail, Result};
use lazyload_core::LazyConfig;

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `#lazyload-config` in the document, read at boot time
    Embedded,
    /// Passed in by the page
    Explicit(LazyConfig),
}

/// What the caller must do after [`BootGate::request`].
#[derive(Debug, PartialEq)]
pub enum Request {
    /// The document is ready: boot now with this source
    BootNow(ConfigSource),
    /// Parked; register the readiness listener
    Wait,
    /// Replaced an already parked request; the listener exists
    Replaced,
}

#[derive(Debug, Default)]
enum GateState {
    #[default]
    Idle,
    Waiting(ConfigSource),
    Booted,
}

#[derive(Debug, Default)]
pub struct BootGate {
    state: GateState,
}

impl BootGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask to boot with `source`.
    pub fn request(&mut self, source: ConfigSource, document_ready: bool) -> Result<Request> {
        match std::mem::take(&mut self.state) {
            GateState::Booted => {
                self.state = GateState::Booted;
                bail!("lazyload is already running");
            }
            GateState::Waiting(_) => {
                self.state = GateState::Waiting(source);
                Ok(Request::Replaced)
            }
            GateState::Idle if document_ready => {
                self.state = GateState::Booted;
                Ok(Request::BootNow(source))
            }
            GateState::Idle => {
                self.state = GateState::Waiting(source);
                Ok(Request::Wait)
            }
        }
    }

    /// The document became ready. Returns the parked source, at most once.
    pub fn on_ready(&mut self) -> Option<ConfigSource> {
        match std::mem::take(&mut self.state) {
            GateState::Waiting(source) => {
                self.state = GateState::Booted;
                Some(source)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    #[cfg(test)]
    fn is_booted(&self) -> bool {
        matches!(self.state, GateState::Booted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explicit(delay: u64) -> ConfigSource {
        ConfigSource::Explicit(LazyConfig {
            fallback_delay_ms: delay,
            ..LazyConfig::default()
        })
    }

    #[test]
    fn test_ready_document_boots_immediately() {
        let mut gate = BootGate::new();

        let request = gate.request(explicit(250), true).unwrap();

        assert_eq!(request, Request::BootNow(explicit(250)));
        assert!(gate.is_booted());
        assert_eq!(gate.on_ready(), None);
    }

    #[test]
    fn test_loading_document_waits_for_ready() {
        let mut gate = BootGate::new();

        assert_eq!(gate.request(ConfigSource::Embedded, false).unwrap(), Request::Wait);
        assert!(!gate.is_booted());

        assert_eq!(gate.on_ready(), Some(ConfigSource::Embedded));
        assert!(gate.is_booted());
        assert_eq!(gate.on_ready(), None);
    }

    #[test]
    fn test_latest_request_before_ready_wins() {
        let mut gate = BootGate::new();

        gate.request(ConfigSource::Embedded, false).unwrap();
        assert_eq!(gate.request(explicit(500), false).unwrap(), Request::Replaced);

        assert_eq!(gate.on_ready(), Some(explicit(500)));
    }

    #[test]
    fn test_boots_at_most_once() {
        let mut gate = BootGate::new();
        gate.request(ConfigSource::Embedded, true).unwrap();

        assert!(gate.request(explicit(500), true).is_err());
        assert!(gate.request(ConfigSource::Embedded, false).is_err());
        assert!(gate.is_booted());
    }

    #[test]
    fn test_ready_without_request_does_nothing() {
        let mut gate = BootGate::new();

        assert_eq!(gate.on_ready(), None);
        assert_eq!(gate.request(explicit(0), true).unwrap(), Request::BootNow(explicit(0)));
    }
}
