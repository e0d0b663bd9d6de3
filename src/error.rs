//! Error types for chunksync operations.

use thiserror::Error;

/// Errors that can occur during signature and delta operations.
#[derive(Error, Debug)]
pub enum ChunkSyncError {
    /// I/O error during read/write operations, including a stream that ends
    /// before (or continues past) its declared length.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Signature metadata declares a chunk size below the supported minimum.
    #[error("invalid signature metadata: chunk size {0} too small")]
    ChunkSizeTooSmall(u32),

    /// Signature stream ended before the declared number of digests.
    #[error("invalid signature: size too small ({found} of {expected} digests present)")]
    SignatureTooSmall {
        /// Digest count declared in the metadata.
        expected: u32,
        /// Complete digests actually present.
        found: u32,
    },

    /// Signature stream carries bytes beyond the declared number of digests.
    #[error("invalid signature: size too large (trailing bytes after {expected} digests)")]
    SignatureTooLarge {
        /// Digest count declared in the metadata.
        expected: u32,
    },

    /// Delta stream does not conform to the wire format.
    #[error("corrupted delta stream: {0}")]
    CorruptedDelta(String),

    /// Delta pointer references a chunk past the end of the reference file.
    #[error("pointer index {index} out of range ({chunk_count} reference chunks)")]
    PointerOutOfRange {
        /// Index carried by the pointer entry.
        index: u32,
        /// Number of chunks the reference file actually holds.
        chunk_count: u32,
    },

    /// Input file is below the minimum size worth chunking.
    #[error("input too small: {size} bytes (minimum {minimum})")]
    InputTooSmall {
        /// Actual input size in bytes.
        size: u64,
        /// Required minimum in bytes.
        minimum: u64,
    },
}

/// Result type for chunksync operations.
pub type Result<T> = std::result::Result<T, ChunkSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ChunkSyncError::Io(io_err);
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_display_chunk_size_too_small() {
        let err = ChunkSyncError::ChunkSizeTooSmall(31);
        assert!(err.to_string().contains("chunk size 31 too small"));
    }

    #[test]
    fn error_display_signature_too_small() {
        let err = ChunkSyncError::SignatureTooSmall {
            expected: 10,
            found: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("size too small"));
        assert!(msg.contains("7 of 10"));
    }

    #[test]
    fn error_display_signature_too_large() {
        let err = ChunkSyncError::SignatureTooLarge { expected: 4 };
        let msg = err.to_string();
        assert!(msg.contains("size too large"));
        assert!(msg.contains("4 digests"));
    }

    #[test]
    fn error_display_corrupted_delta() {
        let err = ChunkSyncError::CorruptedDelta("unknown entry tag 0x51".to_string());
        assert!(err.to_string().contains("corrupted delta"));
        assert!(err.to_string().contains("0x51"));
    }

    #[test]
    fn error_display_pointer_out_of_range() {
        let err = ChunkSyncError::PointerOutOfRange {
            index: 9,
            chunk_count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("index 9"));
        assert!(msg.contains("3 reference chunks"));
    }

    #[test]
    fn error_display_input_too_small() {
        let err = ChunkSyncError::InputTooSmall {
            size: 12,
            minimum: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("12 bytes"));
        assert!(msg.contains("minimum 64"));
    }

    #[test]
    fn result_type_err() {
        let result: Result<i32> = Err(ChunkSyncError::ChunkSizeTooSmall(0));
        assert!(result.is_err());
    }
}
