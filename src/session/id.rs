//! Opaque identifiers for sessions and listed entities.

use std::borrow::Borrow;
use std::fmt;

use rand::Rng;
use sha2::{Digest, Sha512};

/// Every `TRUNCATION_STEP`-th hex digit of the digest is kept.
pub const TRUNCATION_STEP: usize = 20;

/// Opaque identifier handed out to clients.
///
/// Identifiers are produced by hashing a target string together with a
/// fresh random salt, so generating twice for the same input yields
/// unrelated values. They are addressing tokens, not secrets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Generate a new identifier for `target`.
    pub fn generate(target: &str) -> Self {
        let salt: u64 = rand::thread_rng().gen();

        let mut hasher = Sha512::new();
        hasher.update(salt.to_le_bytes());
        hasher.update(target.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Self(truncate_digest(&digest))
    }

    /// Wrap an already-formed identifier string.
    ///
    /// This is primarily for testing and lookups.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Keep every [`TRUNCATION_STEP`]-th character, starting with the first.
pub fn truncate_digest(digest: &str) -> String {
    digest.chars().step_by(TRUNCATION_STEP).collect()
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
