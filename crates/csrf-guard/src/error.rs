//! Error taxonomy for token issue, verification, and configuration.
//!
//! Every variant propagates to the immediate caller; nothing is caught and
//! retried inside the crate. `try_verify` converts the expected no-match
//! case into `Ok(false)`; all other variants still surface as errors there.

use crate::config::{ConfigKey, ValueSource};

/// Errors from token generation, verification, and configuration.
#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    /// The session is not active and auto-start is disabled.
    #[error("session is not active and auto-start is disabled")]
    SessionInactive,

    /// The host session collaborator failed to start the session.
    #[error("session could not be started")]
    SessionStart(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No outstanding token matched the submitted value.
    ///
    /// Expected in normal operation (stale form, replayed submission),
    /// never a programming bug.
    #[error("no outstanding token matched the submitted value")]
    InvalidToken,

    /// A configuration value failed validation.
    #[error("invalid {key} (from {source})")]
    InvalidConfig {
        /// Which value failed.
        key: ConfigKey,
        /// Which resolution source produced it.
        source: ValueSource,
    },

    /// A configuration setter ran after the value was already set.
    #[error("{key} is already set")]
    ConfigOverwritten {
        /// Which value was set twice.
        key: ConfigKey,
    },

    /// The OS random source failed to produce entropy.
    #[error("secure random source failed")]
    RandomSource(#[from] rand::Error),
}
