//! Token text: generation from OS randomness and constant-time comparison.

use base64::alphabet::Alphabet;
use base64::engine::general_purpose::PAD;
use base64::engine::GeneralPurpose;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::CsrfError;

/// Bytes of CSPRNG entropy behind each token (768 bits).
pub const TOKEN_ENTROPY_BYTES: usize = 96;

/// Length of the encoded token. 96 bytes are a multiple of 3, so the encoded
/// form is exactly 128 characters and never carries `=` padding.
pub const TOKEN_LENGTH: usize = TOKEN_ENTROPY_BYTES / 3 * 4;

/// Standard base64 alphabet with `_` in place of `+` and `.` in place of
/// `/`, keeping tokens inert inside URLs and HTML attribute values.
const TOKEN_ALPHABET: Alphabet = match Alphabet::new(
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_.",
) {
    Ok(alphabet) => alphabet,
    Err(_) => panic!("token alphabet must be 64 unique printable ASCII bytes"),
};

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(&TOKEN_ALPHABET, PAD);

/// Generate a fresh token from OS randomness.
///
/// # Errors
///
/// Returns [`CsrfError::RandomSource`] if the OS CSPRNG fails. The failure
/// propagates as-is; there is no fallback to a weaker source.
pub fn generate() -> Result<String, CsrfError> {
    let mut entropy = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng.try_fill_bytes(&mut entropy)?;
    Ok(TOKEN_ENGINE.encode(entropy))
}

/// Compare two strings in constant time.
///
/// Equal-length inputs are compared without short-circuiting on the first
/// differing byte. Unequal lengths compare unequal; only the length itself
/// is observable through timing.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Comparison agrees with ordinary equality for arbitrary inputs
        #[test]
        fn constant_time_eq_agrees_with_eq(a: String, b: String) {
            prop_assert_eq!(constant_time_eq(&a, &b), a == b);
        }

        /// Comparison is reflexive
        #[test]
        fn constant_time_eq_reflexive(s: String) {
            prop_assert!(constant_time_eq(&s, &s));
        }
    }
}
