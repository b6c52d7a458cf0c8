//! Shared-secret comparison and hashing.
//!
//! # Security
//!
//! - [`validate_secret`] runs the same constant-time primitive over
//!   `expected.len()` bytes whatever the candidate looks like, so neither the
//!   position of the first mismatch nor a length mismatch shows up in timing.
//! - [`hash_secret`] produces the SHA-256 digest stored alongside a session
//!   for audit. It is never used to re-validate anything.

use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

/// Compare a presented secret against the configured one in constant time.
///
/// The candidate is copied into a zeroed buffer at least as long as
/// `expected`, and the first `expected.len()` bytes of that buffer are
/// compared with `ConstantTimeEq`. No step branches on where the two inputs
/// differ; the length check is folded in with a constant-time AND rather
/// than an early return.
///
/// Returns `true` iff both strings are byte-for-byte equal.
#[must_use]
pub fn validate_secret(candidate: &str, expected: &str) -> bool {
    let candidate = candidate.as_bytes();
    let expected = expected.as_bytes();

    let mut padded = vec![0u8; expected.len().max(candidate.len())];
    padded[..candidate.len()].copy_from_slice(candidate);

    let bytes_equal: Choice = padded[..expected.len()].ct_eq(expected);
    let lengths_equal: Choice = (candidate.len() as u64).ct_eq(&(expected.len() as u64));

    (bytes_equal & lengths_equal).into()
}

/// SHA-256 hex digest of a secret.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
