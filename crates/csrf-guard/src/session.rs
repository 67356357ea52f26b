//! Host session collaborators.
//!
//! The guard never reaches into ambient request state: the host supplies a
//! session object implementing [`SessionState`] (activation) and
//! [`SessionStorage`] (namespaced record storage). [`MemorySession`] is an
//! in-process implementation for tests and single-process hosts.

use std::collections::HashMap;

use crate::store::TokenRecord;

/// Boxed error from the host's session-start machinery.
pub type SessionStartError = Box<dyn std::error::Error + Send + Sync>;

/// Session activation, supplied by the host environment.
pub trait SessionState {
    /// Whether a session is active for the current request.
    fn is_active(&self) -> bool;

    /// Begin a session.
    ///
    /// # Errors
    ///
    /// Hosts fail here when a session can no longer be begun, e.g. after
    /// response output has already been sent.
    fn start(&mut self) -> Result<(), SessionStartError>;
}

/// Read/write access to an ordered record sequence under a string key,
/// scoped to the active session.
pub trait SessionStorage {
    /// Whether `namespace` currently holds a value.
    fn exists(&self, namespace: &str) -> bool;

    /// Load the sequence stored under `namespace`.
    ///
    /// Returns `None` when the namespace is absent or its stored value can
    /// no longer be decoded; the caller treats both as an empty sequence.
    fn load(&self, namespace: &str) -> Option<Vec<TokenRecord>>;

    /// Replace the whole sequence under `namespace`.
    fn replace(&mut self, namespace: &str, records: Vec<TokenRecord>);
}

impl<T: SessionState + ?Sized> SessionState for &mut T {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn start(&mut self) -> Result<(), SessionStartError> {
        (**self).start()
    }
}

impl<T: SessionStorage + ?Sized> SessionStorage for &mut T {
    fn exists(&self, namespace: &str) -> bool {
        (**self).exists(namespace)
    }

    fn load(&self, namespace: &str) -> Option<Vec<TokenRecord>> {
        (**self).load(namespace)
    }

    fn replace(&mut self, namespace: &str, records: Vec<TokenRecord>) {
        (**self).replace(namespace, records);
    }
}

/// In-memory session, one per request context.
#[derive(Debug, Default)]
pub struct MemorySession {
    active: bool,
    namespaces: HashMap<String, Vec<TokenRecord>>,
}

impl MemorySession {
    /// A session that has not been started yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that is already active, as after the host ran its
    /// session-start hook.
    #[must_use]
    pub fn started() -> Self {
        Self {
            active: true,
            namespaces: HashMap::new(),
        }
    }
}

impl SessionState for MemorySession {
    fn is_active(&self) -> bool {
        self.active
    }

    fn start(&mut self) -> Result<(), SessionStartError> {
        self.active = true;
        Ok(())
    }
}

impl SessionStorage for MemorySession {
    fn exists(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    fn load(&self, namespace: &str) -> Option<Vec<TokenRecord>> {
        self.namespaces.get(namespace).cloned()
    }

    fn replace(&mut self, namespace: &str, records: Vec<TokenRecord>) {
        self.namespaces.insert(namespace.to_string(), records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_inactive_until_started() {
        let mut session = MemorySession::new();
        assert!(!session.is_active());
        session.start().expect("memory sessions always start");
        assert!(session.is_active());
    }

    #[test]
    fn load_reports_absent_namespaces() {
        let session = MemorySession::started();
        assert!(!session.exists("tokens"));
        assert_eq!(session.load("tokens"), None);
    }

    #[test]
    fn replace_overwrites_the_whole_sequence() {
        let mut session = MemorySession::started();
        session.replace(
            "tokens",
            vec![TokenRecord {
                token: "t".to_string(),
                expires_at: 1,
            }],
        );
        session.replace("tokens", Vec::new());
        assert_eq!(session.load("tokens"), Some(Vec::new()));
    }
}
