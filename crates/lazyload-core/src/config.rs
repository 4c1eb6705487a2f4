//! Lazy Loading Configuration
//!
//! Provides the tunables of the activation engine. Every field has a
//! default, so pages can embed a partial JSON object.

use crate::placeholder::{data_uri, PLACEHOLDER_DATA_URI};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default candidate query
pub const DEFAULT_SELECTOR: &str = r#"img[loading="lazy"]"#;

/// Default fallback delay in milliseconds
pub const DEFAULT_FALLBACK_DELAY_MS: u64 = 1000;

/// Largest delay a browser timer accepts (signed 32-bit milliseconds)
pub const MAX_FALLBACK_DELAY_MS: u64 = i32::MAX as u64;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LazyConfig {
    /// CSS selector that yields the candidate set
    pub selector: String,

    /// Delay before the fallback timer activates everything (ms)
    /// Default: 1000
    pub fallback_delay_ms: u64,

    /// Observer root margin, CSS margin syntax
    /// Default: "0px"
    pub root_margin: String,

    /// Observer intersection threshold in [0, 1]
    /// Default: 0.0 (any overlap counts)
    pub threshold: f64,

    /// Source shown while the real one is deferred
    pub placeholder: String,
}

impl Default for LazyConfig {
    fn default() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.to_string(),
            fallback_delay_ms: DEFAULT_FALLBACK_DELAY_MS,
            root_margin: "0px".to_string(),
            threshold: 0.0,
            placeholder: PLACEHOLDER_DATA_URI.to_string(),
        }
    }
}

impl LazyConfig {
    /// Start loading images shortly before they scroll into view
    pub fn prefetch_margin() -> Self {
        Self {
            root_margin: "200px".to_string(),
            ..Self::default()
        }
    }

    /// Fallback that activates on the next timer tick
    pub fn eager_fallback() -> Self {
        Self {
            fallback_delay_ms: 0,
            ..Self::default()
        }
    }

    /// Use custom placeholder image bytes
    pub fn with_placeholder_image(mut self, mime: &str, bytes: &[u8]) -> Self {
        self.placeholder = data_uri(mime, bytes);
        self
    }

    /// Fallback delay as a duration
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    /// Parse and validate a JSON configuration object
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selector.trim().is_empty() {
            return Err(ConfigError::EmptySelector);
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.fallback_delay_ms > MAX_FALLBACK_DELAY_MS {
            return Err(ConfigError::DelayTooLong(self.fallback_delay_ms));
        }
        if self.placeholder.is_empty() {
            return Err(ConfigError::EmptyPlaceholder);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Selector cannot be empty")]
    EmptySelector,

    #[error("Threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    #[error("Fallback delay of {0}ms exceeds the timer maximum")]
    DelayTooLong(u64),

    #[error("Placeholder source cannot be empty")]
    EmptyPlaceholder,

    #[error("Malformed configuration: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LazyConfig::default();

        assert_eq!(config.selector, "img[loading=\"lazy\"]");
        assert_eq!(config.fallback_delay(), Duration::from_millis(1000));
        assert_eq!(config.placeholder, PLACEHOLDER_DATA_URI);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(LazyConfig::prefetch_margin().validate().is_ok());
        assert!(LazyConfig::eager_fallback().validate().is_ok());
        assert_eq!(LazyConfig::eager_fallback().fallback_delay(), Duration::ZERO);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LazyConfig::default();
        config.threshold = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreshold(1.5)));

        let mut config = LazyConfig::default();
        config.selector = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptySelector));

        let mut config = LazyConfig::default();
        config.fallback_delay_ms = MAX_FALLBACK_DELAY_MS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::DelayTooLong(_))));
    }

    #[test]
    fn test_partial_json() {
        let config = LazyConfig::from_json(r#"{"fallback_delay_ms": 250}"#).unwrap();

        assert_eq!(config.fallback_delay_ms, 250);
        assert_eq!(config.selector, DEFAULT_SELECTOR);
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        assert!(matches!(
            LazyConfig::from_json(r#"{"threshold": -0.1}"#),
            Err(ConfigError::InvalidThreshold(_))
        ));
        assert!(matches!(
            LazyConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_custom_placeholder_image() {
        let config = LazyConfig::default().with_placeholder_image("image/png", &[0x89, b'P', b'N', b'G']);
        assert_eq!(config.placeholder, "data:image/png;base64,iVBORw==");
    }
}
