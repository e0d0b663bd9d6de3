//! # chunksync
//!
//! Chunk-based file synchronization: one side publishes a compact signature
//! of a reference file (fixed-size chunks, one cryptographic digest each);
//! the other side consumes that signature to encode a new version of the
//! file as a delta (reuse-pointers into the reference plus raw bytes for
//! unmatched chunks), so unchanged content is never retransmitted.
//!
//! Matching is whole-chunk and any-position. Reordered, deleted, and
//! inserted chunks are all detected; content shifted by a non-multiple of
//! the chunk size is not (no rolling checksum).
//!
//! ## Example
//!
//! ```rust
//! use chunksync::{DeltaStream, SignatureData};
//! use std::io::Cursor;
//!
//! let reference = vec![7u8; 2048];
//! let mut new_file = reference.clone();
//! new_file.extend_from_slice(b"appended tail");
//!
//! // Reference holder publishes a signature.
//! let signature = SignatureData::from_reader(
//!     &mut Cursor::new(&reference),
//!     reference.len() as u64,
//!     512,
//! )
//! .unwrap();
//!
//! // New-file holder answers with a delta.
//! let delta = DeltaStream::compute(
//!     &signature,
//!     &mut Cursor::new(&new_file),
//!     new_file.len() as u64,
//! )
//! .unwrap();
//!
//! // Reference holder reconstructs the new file.
//! let mut rebuilt = Vec::new();
//! delta.apply(&mut Cursor::new(&reference), &mut rebuilt).unwrap();
//! assert_eq!(rebuilt, new_file);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod async_ops;
mod chunker;
mod delta;
mod digest;
mod error;
mod signature;

pub use chunker::{chunk_size_for, MIN_CHUNK_SIZE};
pub use delta::{DeltaEntry, DeltaStats, DeltaStream};
pub use digest::{ChunkDigest, DIGEST_LEN};
pub use error::{ChunkSyncError, Result};
pub use signature::{SignatureData, SignatureMetadata};

/// Encode a signature for an in-memory reference file.
///
/// The chunk size is chosen by [`chunk_size_for`] from the data length.
///
/// # Errors
///
/// Returns an error only if the derived metadata is invalid; in-memory
/// reads cannot fail.
pub fn signature_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let chunk_size = chunk_size_for(data.len() as u64);
    let signature = SignatureData::from_reader(&mut &data[..], data.len() as u64, chunk_size)?;
    Ok(signature.encode())
}

/// Encode a delta for in-memory new data against an encoded signature.
///
/// # Errors
///
/// Returns an error if the signature fails to decode.
pub fn delta_bytes(signature: &[u8], new_data: &[u8]) -> Result<Vec<u8>> {
    let signature = SignatureData::decode(signature)?;
    let delta = DeltaStream::compute(&signature, &mut &new_data[..], new_data.len() as u64)?;
    Ok(delta.encode())
}
