//! Error types.
//!
//! Missing capabilities and missing attributes are not errors. These
//! variants cover the environment refusing an operation outright.

use crate::config::ConfigError;

/// Errors raised while wiring the engine to its environment.
#[derive(Debug, thiserror::Error)]
pub enum LazyError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Required global `{0}` is not available")]
    MissingGlobal(&'static str),

    #[error("Candidate query failed: {0}")]
    Query(String),

    #[error("Viewport observer could not be created: {0}")]
    Observer(String),

    #[error("Fallback timer could not be scheduled: {0}")]
    Scheduler(String),
}
