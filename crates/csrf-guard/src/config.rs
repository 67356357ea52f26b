//! Guard configuration with explicit, single-shot resolution.
//!
//! Each value resolves exactly once, from the first of: an explicit builder
//! setter, the process environment, a hardcoded default. Setters may run at
//! most once per value; a second call fails with
//! [`CsrfError::ConfigOverwritten`]. Environment values are validated on
//! resolution; an invalid value is an error, never a silent fallback to the
//! default.

use std::env;
use std::fmt;

use crate::error::CsrfError;

/// Environment variable for the session namespace key.
pub const ENV_SESSION_KEY: &str = "CSRF_GUARD_SESSION_KEY";
/// Environment variable for the token lifetime in seconds.
pub const ENV_TOKEN_PERIOD: &str = "CSRF_GUARD_TOKEN_PERIOD";
/// Environment variable for the session auto-start flag (numeric boolean).
pub const ENV_SESSION_AUTO_START: &str = "CSRF_GUARD_SESSION_AUTO_START";
/// Environment variable for the hidden form field name.
pub const ENV_FIELD_NAME: &str = "CSRF_GUARD_FIELD_NAME";

const DEFAULT_SESSION_KEY: &str = "csrf-guard/tokens";
const DEFAULT_TOKEN_PERIOD: u64 = 30 * 60;
const DEFAULT_SESSION_AUTO_START: bool = false;
const DEFAULT_FIELD_NAME: &str = "csrf_guard_token";

/// The configurable values, named in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// Session namespace key under which outstanding tokens are stored.
    SessionKey,
    /// Token lifetime in seconds.
    TokenPeriod,
    /// Whether an inactive session may be started implicitly.
    SessionAutoStart,
    /// Name of the hidden form field carrying the token.
    FieldName,
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SessionKey => "session key",
            Self::TokenPeriod => "token period",
            Self::SessionAutoStart => "session auto start",
            Self::FieldName => "field name",
        })
    }
}

/// Which mechanism supplied a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// An explicit builder setter.
    Setter,
    /// An environment variable.
    Environment,
    /// The hardcoded default.
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setter => "setter",
            Self::Environment => "environment",
            Self::Default => "default",
        })
    }
}

// `CsrfError::InvalidConfig` carries a field named `source`; thiserror treats
// any field so named as the error source and requires it to implement
// `std::error::Error`. This impl satisfies that bound without changing the
// enum's values or `Display` output.
impl std::error::Error for ValueSource {}

/// Resolved, immutable configuration for one guard instance.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    session_key: String,
    token_period: u64,
    session_auto_start: bool,
    field_name: String,
}

impl CsrfConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> CsrfConfigBuilder {
        CsrfConfigBuilder::default()
    }

    /// Session namespace key under which outstanding tokens live.
    #[must_use]
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Token lifetime in seconds.
    #[must_use]
    pub fn token_period(&self) -> u64 {
        self.token_period
    }

    /// Whether an inactive session may be started implicitly.
    #[must_use]
    pub fn session_auto_start(&self) -> bool {
        self.session_auto_start
    }

    /// Name of the hidden form field carrying the token.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

/// Builder with single-shot setters.
///
/// Values left unset resolve from the environment, then from the defaults,
/// when [`build`](Self::build) runs. Once built, the configuration is
/// immutable.
#[derive(Debug, Default)]
pub struct CsrfConfigBuilder {
    session_key: Option<String>,
    token_period: Option<u64>,
    session_auto_start: Option<bool>,
    field_name: Option<String>,
}

impl CsrfConfigBuilder {
    /// Set the session namespace key.
    ///
    /// # Errors
    ///
    /// [`CsrfError::ConfigOverwritten`] if the key was already set;
    /// [`CsrfError::InvalidConfig`] if `key` is empty.
    pub fn session_key(mut self, key: impl Into<String>) -> Result<Self, CsrfError> {
        if self.session_key.is_some() {
            return Err(CsrfError::ConfigOverwritten {
                key: ConfigKey::SessionKey,
            });
        }
        self.session_key = Some(validate_session_key(key.into(), ValueSource::Setter)?);
        Ok(self)
    }

    /// Set the token lifetime in seconds.
    ///
    /// # Errors
    ///
    /// [`CsrfError::ConfigOverwritten`] if the period was already set;
    /// [`CsrfError::InvalidConfig`] if `seconds` is zero.
    pub fn token_period(mut self, seconds: u64) -> Result<Self, CsrfError> {
        if self.token_period.is_some() {
            return Err(CsrfError::ConfigOverwritten {
                key: ConfigKey::TokenPeriod,
            });
        }
        if seconds == 0 {
            return Err(CsrfError::InvalidConfig {
                key: ConfigKey::TokenPeriod,
                source: ValueSource::Setter,
            });
        }
        self.token_period = Some(seconds);
        Ok(self)
    }

    /// Set whether an inactive session may be started implicitly.
    ///
    /// # Errors
    ///
    /// [`CsrfError::ConfigOverwritten`] if the flag was already set.
    pub fn session_auto_start(mut self, auto_start: bool) -> Result<Self, CsrfError> {
        if self.session_auto_start.is_some() {
            return Err(CsrfError::ConfigOverwritten {
                key: ConfigKey::SessionAutoStart,
            });
        }
        self.session_auto_start = Some(auto_start);
        Ok(self)
    }

    /// Set the hidden form field name.
    ///
    /// # Errors
    ///
    /// [`CsrfError::ConfigOverwritten`] if the name was already set.
    pub fn field_name(mut self, name: impl Into<String>) -> Result<Self, CsrfError> {
        if self.field_name.is_some() {
            return Err(CsrfError::ConfigOverwritten {
                key: ConfigKey::FieldName,
            });
        }
        self.field_name = Some(name.into());
        Ok(self)
    }

    /// Resolve all remaining values from the process environment and build.
    ///
    /// # Errors
    ///
    /// [`CsrfError::InvalidConfig`] if an environment value fails
    /// validation. There is no fallback to the default in that case.
    pub fn build(self) -> Result<CsrfConfig, CsrfError> {
        self.build_from_lookup(|key| env::var(key).ok())
    }

    /// Resolve all remaining values through a custom lookup and build.
    ///
    /// The process environment is just `|key| std::env::var(key).ok()`;
    /// tests and embedding hosts may supply any other source.
    ///
    /// # Errors
    ///
    /// [`CsrfError::InvalidConfig`] if a looked-up value fails validation.
    pub fn build_from_lookup<F>(self, mut lookup: F) -> Result<CsrfConfig, CsrfError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let session_key = match self.session_key {
            Some(value) => value,
            None => match lookup(ENV_SESSION_KEY) {
                Some(raw) => validate_session_key(raw, ValueSource::Environment)?,
                None => DEFAULT_SESSION_KEY.to_string(),
            },
        };

        let token_period = match self.token_period {
            Some(value) => value,
            None => match lookup(ENV_TOKEN_PERIOD) {
                Some(raw) => parse_token_period(&raw, ValueSource::Environment)?,
                None => DEFAULT_TOKEN_PERIOD,
            },
        };

        let session_auto_start = match self.session_auto_start {
            Some(value) => value,
            None => match lookup(ENV_SESSION_AUTO_START) {
                Some(raw) => parse_auto_start(&raw, ValueSource::Environment)?,
                None => DEFAULT_SESSION_AUTO_START,
            },
        };

        let field_name = match self.field_name {
            Some(value) => value,
            None => lookup(ENV_FIELD_NAME).unwrap_or_else(|| DEFAULT_FIELD_NAME.to_string()),
        };

        Ok(CsrfConfig {
            session_key,
            token_period,
            session_auto_start,
            field_name,
        })
    }
}

fn validate_session_key(value: String, source: ValueSource) -> Result<String, CsrfError> {
    if value.is_empty() {
        return Err(CsrfError::InvalidConfig {
            key: ConfigKey::SessionKey,
            source,
        });
    }
    Ok(value)
}

fn parse_token_period(raw: &str, source: ValueSource) -> Result<u64, CsrfError> {
    let invalid = || CsrfError::InvalidConfig {
        key: ConfigKey::TokenPeriod,
        source,
    };
    let value: i64 = raw.trim().parse().map_err(|_| invalid())?;
    u64::try_from(value).ok().filter(|&v| v > 0).ok_or_else(invalid)
}

fn parse_auto_start(raw: &str, source: ValueSource) -> Result<bool, CsrfError> {
    let value: i64 = raw.trim().parse().map_err(|_| CsrfError::InvalidConfig {
        key: ConfigKey::SessionAutoStart,
        source,
    })?;
    Ok(value != 0)
}
