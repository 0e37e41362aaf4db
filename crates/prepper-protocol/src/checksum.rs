//! Body digests carried in packet footers.

use md5::{Digest, Md5};

/// Length of a hex-encoded checksum.
pub const CHECKSUM_LEN: usize = 32;

/// Computes the lowercase hex MD5 digest of `bytes`.
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// Returns `true` when `expected` matches the digest of `bytes`.
///
/// Comparison ignores ASCII case so peers emitting upper-case hex still
/// validate.
#[must_use]
pub fn verify_checksum(bytes: &[u8], expected: &str) -> bool {
    checksum(bytes).eq_ignore_ascii_case(expected.trim())
}
