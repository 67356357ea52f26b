//! Issue/verify facade binding the codec, the store, and the host session.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec;
use crate::config::CsrfConfig;
use crate::error::CsrfError;
use crate::session::{SessionState, SessionStorage};
use crate::store::{self, TokenRecord};

/// Anti-forgery token service for one session namespace.
///
/// A guard owns (or borrows, through the blanket `&mut` trait impls) the
/// host session for the duration of one request. Instantiate one guard per
/// namespace/tenant; two guards configured with different session keys over
/// the same session do not see each other's tokens.
pub struct CsrfGuard<S> {
    config: CsrfConfig,
    session: S,
}

impl<S> CsrfGuard<S> {
    /// Bind a configuration to a host session.
    pub fn new(config: CsrfConfig, session: S) -> Self {
        Self { config, session }
    }

    /// The resolved configuration this guard runs under.
    #[must_use]
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Give the session back to the host, e.g. for persistence.
    pub fn into_session(self) -> S {
        self.session
    }
}

impl<S: SessionState + SessionStorage> CsrfGuard<S> {
    /// Issue a new single-use token and record it in the session.
    ///
    /// The token expires `token_period` seconds from now. Expired records
    /// are swept before the new one is inserted.
    ///
    /// # Errors
    ///
    /// [`CsrfError::SessionInactive`] or [`CsrfError::SessionStart`] when
    /// the session cannot be made active, [`CsrfError::RandomSource`] when
    /// the OS CSPRNG fails.
    pub fn generate(&mut self) -> Result<String, CsrfError> {
        self.generate_at(unix_now())
    }

    /// Verify and consume a token, failing on mismatch.
    ///
    /// # Errors
    ///
    /// [`CsrfError::InvalidToken`] when no outstanding token matches, plus
    /// the session errors described on [`generate`](Self::generate).
    pub fn verify(&mut self, token: &str) -> Result<(), CsrfError> {
        if self.try_verify(token)? {
            Ok(())
        } else {
            Err(CsrfError::InvalidToken)
        }
    }

    /// Verify and consume a token, reporting mismatch as `Ok(false)`.
    ///
    /// This is the only place the expected no-match outcome becomes a
    /// boolean; session and configuration failures still surface as errors.
    ///
    /// # Errors
    ///
    /// The session errors described on [`generate`](Self::generate).
    pub fn try_verify(&mut self, token: &str) -> Result<bool, CsrfError> {
        self.try_verify_at(token, unix_now())
    }

    /// Issue a token and render it as a hidden form input.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate).
    pub fn hidden_input(&mut self) -> Result<String, CsrfError> {
        let token = self.generate()?;
        Ok(format!(
            r#"<input type="hidden" name="{}" value="{token}" />"#,
            self.config.field_name()
        ))
    }

    /// Verify the token carried in submitted form data, failing on mismatch.
    ///
    /// Reads the configured field name; a missing field behaves as an empty
    /// candidate, which never matches.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_form(&mut self, form: &HashMap<String, String>) -> Result<(), CsrfError> {
        if self.try_verify_form(form)? {
            Ok(())
        } else {
            Err(CsrfError::InvalidToken)
        }
    }

    /// Verify the token carried in submitted form data, reporting mismatch
    /// as `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Same as [`try_verify`](Self::try_verify).
    pub fn try_verify_form(&mut self, form: &HashMap<String, String>) -> Result<bool, CsrfError> {
        let candidate = form
            .get(self.config.field_name())
            .map_or("", String::as_str);
        self.try_verify(candidate)
    }

    fn generate_at(&mut self, now: u64) -> Result<String, CsrfError> {
        store::initialize(&mut self.session, &self.config, now)?;

        let token = codec::generate()?;
        let expires_at = now + self.config.token_period();
        store::insert(
            &mut self.session,
            self.config.session_key(),
            TokenRecord {
                token: token.clone(),
                expires_at,
            },
        );

        tracing::debug!(expires_at, "issued anti-forgery token");
        Ok(token)
    }

    fn try_verify_at(&mut self, token: &str, now: u64) -> Result<bool, CsrfError> {
        store::initialize(&mut self.session, &self.config, now)?;
        Ok(store::consume_if_present(
            &mut self.session,
            self.config.session_key(),
            token,
        ))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;

    fn config_with_period(period: u64) -> CsrfConfig {
        CsrfConfig::builder()
            .token_period(period)
            .expect("first set")
            .build_from_lookup(|_| None)
            .expect("valid config")
    }

    fn guard(period: u64) -> CsrfGuard<MemorySession> {
        CsrfGuard::new(config_with_period(period), MemorySession::started())
    }

    #[test]
    fn token_verifies_just_before_expiry() {
        let mut guard = guard(100);
        let token = guard.generate_at(1_000).expect("generate");
        assert!(guard.try_verify_at(&token, 1_099).expect("verify"));
    }

    // Expiry rule: a record is expired the instant now >= expires_at.
    #[test]
    fn token_expires_the_instant_its_period_ends() {
        let mut guard = guard(100);
        let token = guard.generate_at(1_000).expect("generate");
        assert!(!guard.try_verify_at(&token, 1_100).expect("verify"));
    }

    #[test]
    fn token_fails_past_expiry() {
        let mut guard = guard(100);
        let token = guard.generate_at(1_000).expect("generate");
        assert!(!guard.try_verify_at(&token, 1_101).expect("verify"));
    }

    #[test]
    fn verified_token_cannot_be_replayed() {
        let mut guard = guard(100);
        let token = guard.generate_at(1_000).expect("generate");
        assert!(guard.try_verify_at(&token, 1_001).expect("first use"));
        assert!(!guard.try_verify_at(&token, 1_002).expect("second use"));
    }

    #[test]
    fn verify_surfaces_invalid_token() {
        let mut guard = guard(100);
        let err = guard.verify("never-issued").unwrap_err();
        assert!(matches!(err, CsrfError::InvalidToken));
    }

    #[test]
    fn try_verify_does_not_suppress_session_errors() {
        let mut guard = CsrfGuard::new(config_with_period(100), MemorySession::new());
        let err = guard.try_verify("anything").unwrap_err();
        assert!(matches!(err, CsrfError::SessionInactive));
    }

    #[test]
    fn tokens_are_independent() {
        let mut guard = guard(100);
        let first = guard.generate_at(1_000).expect("generate");
        let second = guard.generate_at(1_000).expect("generate");
        assert_ne!(first, second);
        assert!(guard.try_verify_at(&second, 1_001).expect("second token"));
        assert!(guard.try_verify_at(&first, 1_001).expect("first token"));
        assert!(!guard.try_verify_at(&first, 1_001).expect("first replay"));
    }

    #[test]
    fn expired_tokens_are_swept_before_matching() {
        let mut guard = guard(100);
        let stale = guard.generate_at(1_000).expect("generate");
        let fresh = guard.generate_at(1_090).expect("generate");
        assert!(!guard.try_verify_at(&stale, 1_100).expect("stale token"));
        assert!(guard.try_verify_at(&fresh, 1_100).expect("fresh token"));
    }
}
