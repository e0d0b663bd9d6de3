//! Chunk digest based on BLAKE3.
//!
//! Each chunk of a reference file is summarized by a fixed-width
//! cryptographic hash; equality of digests stands in for equality of
//! chunk contents during delta computation.

use std::fmt;

/// Width of an encoded chunk digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Fixed-width cryptographic digest of a single chunk.
///
/// Collision resistance makes digest equality a safe proxy for byte
/// equality; no ordering semantics beyond equality are defined.
///
/// # Example
///
/// ```rust
/// use chunksync::ChunkDigest;
///
/// let a = ChunkDigest::compute(b"chunk contents");
/// let b = ChunkDigest::compute(b"chunk contents");
/// assert_eq!(a, b);
/// assert_ne!(a, ChunkDigest::compute(b"different contents"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkDigest([u8; DIGEST_LEN]);

impl ChunkDigest {
    /// Compute the BLAKE3 digest of a chunk.
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self(*hash.as_bytes())
    }

    /// Build a digest from its raw encoded bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw encoded bytes of the digest.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Debug for ChunkDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkDigest({self})")
    }
}

impl fmt::Display for ChunkDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
