//! API key validation.
//!
//! The configured secret is bound once at construction and never mutated;
//! tests that vary the secret construct a fresh validator.
//!
//! # Security model
//!
//! - **No secret → reject everything.** Absence of configuration fails
//!   closed; authentication is never silently disabled.
//!
//! - **Constant-time comparison.** Both sides are reduced to SHA-256 digests
//!   before comparing, so every comparison runs over the same 32 bytes no
//!   matter how long (or short) the presented key is — a length mismatch
//!   costs exactly as much as a content mismatch. The digests themselves are
//!   compared with [`subtle::ConstantTimeEq`], which never short-circuits on
//!   the first differing byte.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compares a presented key against the configured secret. Stateless, no
/// side effects.
pub struct KeyValidator {
    secret_digest: Option<[u8; 32]>,
}

fn digest(raw: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().into()
}

impl KeyValidator {
    /// Bind the configured secret. `None` puts the validator in fail-closed
    /// mode.
    pub fn new(secret: Option<&str>) -> Self {
        KeyValidator {
            secret_digest: secret.map(digest),
        }
    }

    /// True iff `presented` matches the configured secret.
    pub fn validate(&self, presented: &str) -> bool {
        match &self.secret_digest {
            None => false,
            Some(expected) => {
                let got = digest(presented);
                bool::from(got.as_slice().ct_eq(expected.as_slice()))
            }
        }
    }
}
