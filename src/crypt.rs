//! Default `hash(bytes) -> u64` implementation.
//!
//! The core's tables (`auth`, `storage`) are generic over a hash function —
//! password hashing algorithms and table-distribution hashing are explicitly
//! out of scope for the dispatch engine itself. This module supplies one
//! concrete, swappable default so the binary links and the hash tables have
//! something to bucket on, built the same way this codebase already hashes
//! things elsewhere (see `network::crypt::generate_hash`): an MD5 digest,
//! here truncated to the first 8 bytes.

use md5::{Digest, Md5};

/// A hash function suitable for table bucketing and as a default, non-secret
/// password-change-detection value. Not a cryptographic password hash —
/// callers that need one should supply their own `Hasher64`.
pub type Hasher64 = dyn Fn(&[u8]) -> u64 + Send + Sync;

/// MD5-derived default hash. Truncates the digest to its first 8 bytes,
/// interpreted big-endian.
pub fn hash64(bytes: &[u8]) -> u64 {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("md5 digest is 16 bytes"))
}
