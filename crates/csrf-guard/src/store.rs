//! Outstanding-token bookkeeping inside the host session.
//!
//! Expiry is lazy: there is no background task. [`initialize`] runs on every
//! issue and every verification, so expired records are swept before any
//! token can be matched.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::config::CsrfConfig;
use crate::error::CsrfError;
use crate::session::{SessionState, SessionStorage};

/// One outstanding token and its expiry, as persisted in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The issued token text.
    pub token: String,
    /// Unix timestamp in seconds; the record is discarded once
    /// `now >= expires_at`.
    pub expires_at: u64,
}

/// Make the session usable: activate it if permitted, shape the namespace,
/// and sweep expired records.
///
/// Runs in full on every generate/verify call; there is deliberately no
/// "already initialized" flag.
pub(crate) fn initialize<S>(
    session: &mut S,
    config: &CsrfConfig,
    now: u64,
) -> Result<(), CsrfError>
where
    S: SessionState + SessionStorage,
{
    if !session.is_active() {
        if !config.session_auto_start() {
            return Err(CsrfError::SessionInactive);
        }
        session.start().map_err(CsrfError::SessionStart)?;
    }

    let namespace = config.session_key();

    // Absent or undecodable state resets to an empty sequence.
    let mut records = if session.exists(namespace) {
        session.load(namespace).unwrap_or_default()
    } else {
        Vec::new()
    };

    sweep_expired(&mut records, now);
    session.replace(namespace, records);

    Ok(())
}

/// Drop every record whose expiry has passed, keeping the survivors dense
/// and in insertion order.
pub(crate) fn sweep_expired(records: &mut Vec<TokenRecord>, now: u64) {
    let before = records.len();
    records.retain(|record| record.expires_at > now);
    let removed = before - records.len();
    if removed > 0 {
        tracing::debug!(removed, remaining = records.len(), "swept expired tokens");
    }
}

/// Append one record. Uniqueness is not checked: at 768 bits of entropy per
/// token, collisions are negligible.
pub(crate) fn insert<S: SessionStorage>(session: &mut S, namespace: &str, record: TokenRecord) {
    let mut records = session.load(namespace).unwrap_or_default();
    records.push(record);
    session.replace(namespace, records);
}

/// Scan the namespace in insertion order; on the first constant-time match,
/// remove that single record and report success.
pub(crate) fn consume_if_present<S: SessionStorage>(
    session: &mut S,
    namespace: &str,
    candidate: &str,
) -> bool {
    let mut records = session.load(namespace).unwrap_or_default();
    let Some(index) = records
        .iter()
        .position(|record| codec::constant_time_eq(&record.token, candidate))
    else {
        return false;
    };
    records.remove(index);
    let outstanding = records.len();
    session.replace(namespace, records);
    tracing::debug!(outstanding, "consumed token");
    true
}
