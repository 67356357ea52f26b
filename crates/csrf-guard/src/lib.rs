//! Session-bound anti-forgery tokens.
//!
//! Issues cryptographically strong, single-use tokens, stores them with an
//! expiry inside a session-scoped namespace, and verifies submissions in
//! constant time, consuming the matched token. The session itself, the
//! transport, and the environment are host concerns, injected through the
//! traits in [`session`] and the lookup hook on
//! [`CsrfConfigBuilder::build_from_lookup`].
//!
//! # Example
//!
//! ```
//! use csrf_guard::{CsrfConfig, CsrfGuard, MemorySession};
//!
//! # fn main() -> Result<(), csrf_guard::CsrfError> {
//! let config = CsrfConfig::builder().token_period(600)?.build()?;
//! let mut guard = CsrfGuard::new(config, MemorySession::started());
//!
//! let token = guard.generate()?;
//! assert!(guard.try_verify(&token)?); // consumed on first use
//! assert!(!guard.try_verify(&token)?); // replay is rejected
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod guard;
pub mod session;
pub mod store;

pub use config::{ConfigKey, CsrfConfig, CsrfConfigBuilder, ValueSource};
pub use error::CsrfError;
pub use guard::CsrfGuard;
pub use session::{MemorySession, SessionStartError, SessionState, SessionStorage};
pub use store::TokenRecord;
