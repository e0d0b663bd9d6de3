//! Signature building and the binary signature codec.
//!
//! A signature summarizes a reference file as an 8-byte metadata record
//! (chunk size and chunk count, little-endian) followed by one fixed-width
//! digest per chunk, concatenated in chunk order with no separators. The
//! decoder validates strictly: a too-small chunk size is rejected before any
//! digest is read, and the digest byte count must match the declared chunk
//! count exactly.

use std::io::{self, Read, Write};

use crate::chunker::MIN_CHUNK_SIZE;
use crate::digest::{ChunkDigest, DIGEST_LEN};
use crate::error::{ChunkSyncError, Result};

/// Fixed-width metadata record leading a signature stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureMetadata {
    /// Chunk size used to split the reference file, in bytes.
    pub chunk_size: u32,
    /// Number of chunks (and digests) the signature describes.
    pub chunk_count: u32,
}

impl SignatureMetadata {
    /// Encoded size of the metadata record in bytes.
    pub const ENCODED_LEN: usize = 8;

    /// Derive metadata for an input of the given declared length.
    ///
    /// The chunk count is `ceil(input_len / chunk_size)`.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkSyncError::ChunkSizeTooSmall`] if `chunk_size` is
    /// below [`MIN_CHUNK_SIZE`], or an I/O error if the chunk count would
    /// not fit the wire format's 32-bit count field.
    pub fn for_input(input_len: u64, chunk_size: u32) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(ChunkSyncError::ChunkSizeTooSmall(chunk_size));
        }
        let count = input_len.div_ceil(u64::from(chunk_size));
        let chunk_count = u32::try_from(count).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("chunk count {count} exceeds the 32-bit count field"),
            )
        })?;
        Ok(Self {
            chunk_size,
            chunk_count,
        })
    }

    /// Encode the record as little-endian bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[0..4].copy_from_slice(&self.chunk_size.to_le_bytes());
        buf[4..8].copy_from_slice(&self.chunk_count.to_le_bytes());
        buf
    }

    /// Decode the record from little-endian bytes.
    #[must_use]
    pub fn decode(buf: &[u8; Self::ENCODED_LEN]) -> Self {
        let chunk_size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let chunk_count = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        Self {
            chunk_size,
            chunk_count,
        }
    }

    /// Read and decode the record from a stream.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stream ends before the full record.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let mut buf = [0u8; Self::ENCODED_LEN];
        input.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }

    /// Reject metadata violating the format invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkSyncError::ChunkSizeTooSmall`] if the chunk size is
    /// below [`MIN_CHUNK_SIZE`].
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(ChunkSyncError::ChunkSizeTooSmall(self.chunk_size));
        }
        Ok(())
    }
}

/// Parsed signature of a reference file.
///
/// Built once by [`SignatureData::from_reader`] or the decoder and immutable
/// afterwards. The position of a digest in the list is the chunk's position
/// in the reference file, and is the index value delta pointers carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureData {
    metadata: SignatureMetadata,
    digests: Vec<ChunkDigest>,
}

impl SignatureData {
    /// Build a signature by streaming a reference file.
    ///
    /// Reads sequential chunks of exactly `chunk_size` bytes (the final
    /// chunk is `input_len % chunk_size` bytes when the length does not
    /// divide evenly) and digests each one.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkSyncError::ChunkSizeTooSmall`] for an undersized chunk
    /// size, or an I/O error if the source ends before `input_len` bytes or
    /// still yields data after `input_len` bytes were consumed.
    pub fn from_reader<R: Read>(input: &mut R, input_len: u64, chunk_size: u32) -> Result<Self> {
        let metadata = SignatureMetadata::for_input(input_len, chunk_size)?;

        let mut digests = Vec::with_capacity(metadata.chunk_count as usize);
        let mut buf = vec![0u8; chunk_size as usize];
        let mut remaining = input_len;
        while remaining > 0 {
            let take = usize::try_from(remaining.min(u64::from(chunk_size)))
                .unwrap_or(chunk_size as usize);
            input.read_exact(&mut buf[..take])?;
            digests.push(ChunkDigest::compute(&buf[..take]));
            remaining -= take as u64;
        }
        ensure_exhausted(input)?;

        Ok(Self { metadata, digests })
    }

    /// Signature metadata record.
    #[must_use]
    pub const fn metadata(&self) -> SignatureMetadata {
        self.metadata
    }

    /// Chunk size the reference file was split with.
    #[must_use]
    pub const fn chunk_size(&self) -> u32 {
        self.metadata.chunk_size
    }

    /// Number of reference chunks described.
    #[must_use]
    pub const fn chunk_count(&self) -> u32 {
        self.metadata.chunk_count
    }

    /// Digests in reference-file chunk order.
    #[must_use]
    pub fn digests(&self) -> &[ChunkDigest] {
        &self.digests
    }

    /// Whether the signature describes an empty reference file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Encode to the canonical binary form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(SignatureMetadata::ENCODED_LEN + self.digests.len() * DIGEST_LEN);
        out.extend_from_slice(&self.metadata.encode());
        for digest in &self.digests {
            out.extend_from_slice(digest.as_bytes());
        }
        out
    }

    /// Write the canonical binary form to a stream.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn write_to<W: Write>(&self, output: &mut W) -> Result<()> {
        output.write_all(&self.metadata.encode())?;
        for digest in &self.digests {
            output.write_all(digest.as_bytes())?;
        }
        Ok(())
    }

    /// Decode a signature from a stream, validating strictly.
    ///
    /// The chunk-size check happens before any digest is read, so an
    /// undersized chunk size is reported regardless of what follows.
    ///
    /// # Errors
    ///
    /// [`ChunkSyncError::ChunkSizeTooSmall`] for an undersized chunk size,
    /// [`ChunkSyncError::SignatureTooSmall`] if the stream ends before the
    /// declared digest count, [`ChunkSyncError::SignatureTooLarge`] if bytes
    /// remain past it, or an I/O error for transport failures.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let metadata = SignatureMetadata::read_from(input)?;
        metadata.validate()?;

        let mut digests = Vec::new();
        for found in 0..metadata.chunk_count {
            let mut buf = [0u8; DIGEST_LEN];
            match input.read_exact(&mut buf) {
                Ok(()) => digests.push(ChunkDigest::from_bytes(buf)),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(ChunkSyncError::SignatureTooSmall {
                        expected: metadata.chunk_count,
                        found,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut probe = [0u8; 1];
        if input.read(&mut probe)? != 0 {
            return Err(ChunkSyncError::SignatureTooLarge {
                expected: metadata.chunk_count,
            });
        }

        Ok(Self { metadata, digests })
    }

    /// Decode a signature from an in-memory buffer.
    ///
    /// # Errors
    ///
    /// Same contract as [`SignatureData::read_from`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut &bytes[..])
    }

    pub(crate) fn from_parts(metadata: SignatureMetadata, digests: Vec<ChunkDigest>) -> Self {
        Self { metadata, digests }
    }
}

/// Fail if the source still yields bytes past its declared length.
fn ensure_exhausted<R: Read>(input: &mut R) -> Result<()> {
    let mut probe = [0u8; 1];
    if input.read(&mut probe)? != 0 {
        return Err(ChunkSyncError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "input longer than its declared length",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    // ==========================================================================
    // METADATA TESTS
    // ==========================================================================

    #[test]
    fn metadata_encode_layout() {
        let md = SignatureMetadata {
            chunk_size: 512,
            chunk_count: 3,
        };
        let buf = md.encode();
        assert_eq!(&buf[0..4], &512u32.to_le_bytes());
        assert_eq!(&buf[4..8], &3u32.to_le_bytes());
    }

    #[test]
    fn metadata_encode_decode_round_trip() {
        let md = SignatureMetadata {
            chunk_size: 4096,
            chunk_count: 77,
        };
        assert_eq!(SignatureMetadata::decode(&md.encode()), md);
    }

    #[test]
    fn metadata_for_input_exact_multiple() {
        let md = SignatureMetadata::for_input(2048, 512).unwrap();
        assert_eq!(md.chunk_count, 4);
    }

    #[test]
    fn metadata_for_input_with_remainder() {
        let md = SignatureMetadata::for_input(2049, 512).unwrap();
        assert_eq!(md.chunk_count, 5);
    }

    #[test]
    fn metadata_for_input_empty() {
        let md = SignatureMetadata::for_input(0, 512).unwrap();
        assert_eq!(md.chunk_count, 0);
    }

    #[test]
    fn metadata_for_input_rejects_small_chunk_size() {
        let err = SignatureMetadata::for_input(2048, 32).unwrap_err();
        assert!(matches!(err, ChunkSyncError::ChunkSizeTooSmall(32)));
    }

    #[test]
    fn metadata_validate_rejects_below_minimum() {
        let md = SignatureMetadata {
            chunk_size: MIN_CHUNK_SIZE - 1,
            chunk_count: 0,
        };
        assert!(matches!(
            md.validate().unwrap_err(),
            ChunkSyncError::ChunkSizeTooSmall(_)
        ));
    }

    // ==========================================================================
    // BUILDER TESTS
    // ==========================================================================

    #[test]
    fn from_reader_empty_input() {
        let sig = SignatureData::from_reader(&mut Cursor::new(&[]), 0, 512).unwrap();
        assert!(sig.is_empty());
        assert_eq!(sig.chunk_count(), 0);
        assert_eq!(sig.chunk_size(), 512);
    }

    #[test]
    fn from_reader_single_short_chunk() {
        let data = b"well under one chunk";
        let sig =
            SignatureData::from_reader(&mut Cursor::new(&data), data.len() as u64, 512).unwrap();
        assert_eq!(sig.chunk_count(), 1);
        assert_eq!(sig.digests()[0], ChunkDigest::compute(data));
    }

    #[test]
    fn from_reader_digests_match_chunks() {
        let data = patterned(1200); // 512 + 512 + 176
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 1200, 512).unwrap();
        assert_eq!(sig.chunk_count(), 3);
        assert_eq!(sig.digests()[0], ChunkDigest::compute(&data[..512]));
        assert_eq!(sig.digests()[1], ChunkDigest::compute(&data[512..1024]));
        assert_eq!(sig.digests()[2], ChunkDigest::compute(&data[1024..]));
    }

    #[test]
    fn from_reader_exact_multiple_has_no_short_chunk() {
        let data = patterned(1024);
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 1024, 512).unwrap();
        assert_eq!(sig.chunk_count(), 2);
        assert_eq!(sig.digests()[1], ChunkDigest::compute(&data[512..]));
    }

    #[test]
    fn from_reader_fails_on_short_input() {
        let data = patterned(700);
        let err = SignatureData::from_reader(&mut Cursor::new(&data), 1024, 512).unwrap_err();
        assert!(matches!(err, ChunkSyncError::Io(_)));
    }

    #[test]
    fn from_reader_fails_on_overlong_input() {
        let data = patterned(1100);
        let err = SignatureData::from_reader(&mut Cursor::new(&data), 1024, 512).unwrap_err();
        assert!(matches!(err, ChunkSyncError::Io(_)));
    }

    // ==========================================================================
    // CODEC TESTS
    // ==========================================================================

    #[test]
    fn encode_layout() {
        let data = patterned(600);
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 600, 512).unwrap();
        let encoded = sig.encode();

        assert_eq!(encoded.len(), 8 + 2 * DIGEST_LEN);
        assert_eq!(&encoded[0..4], &512u32.to_le_bytes());
        assert_eq!(&encoded[4..8], &2u32.to_le_bytes());
        assert_eq!(&encoded[8..40], sig.digests()[0].as_bytes());
        assert_eq!(&encoded[40..72], sig.digests()[1].as_bytes());
    }

    #[test]
    fn encode_decode_round_trip() {
        let data = patterned(3000);
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 3000, 512).unwrap();
        let decoded = SignatureData::decode(&sig.encode()).unwrap();
        assert_eq!(decoded, sig);
        assert_eq!(decoded.metadata(), sig.metadata());
    }

    #[test]
    fn write_to_matches_encode() {
        let data = patterned(900);
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 900, 512).unwrap();
        let mut streamed = Vec::new();
        sig.write_to(&mut streamed).unwrap();
        assert_eq!(streamed, sig.encode());
    }

    #[test]
    fn decode_rejects_truncated_digests() {
        let data = patterned(2000);
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 2000, 512).unwrap();
        let mut encoded = sig.encode();
        encoded.truncate(encoded.len() - 10);

        let err = SignatureData::decode(&encoded).unwrap_err();
        assert!(matches!(
            err,
            ChunkSyncError::SignatureTooSmall {
                expected: 4,
                found: 3
            }
        ));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let data = patterned(2000);
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 2000, 512).unwrap();
        let mut encoded = sig.encode();
        encoded.push(0xAB);

        let err = SignatureData::decode(&encoded).unwrap_err();
        assert!(matches!(
            err,
            ChunkSyncError::SignatureTooLarge { expected: 4 }
        ));
    }

    #[test]
    fn decode_rejects_small_chunk_size_before_digests() {
        let data = patterned(2000);
        let sig = SignatureData::from_reader(&mut Cursor::new(&data), 2000, 512).unwrap();
        let mut encoded = sig.encode();
        // Rewrite the chunk-size field; the digest bytes that follow are now
        // also inconsistent, but the chunk-size check must win.
        encoded[0..4].copy_from_slice(&31u32.to_le_bytes());

        let err = SignatureData::decode(&encoded).unwrap_err();
        assert!(matches!(err, ChunkSyncError::ChunkSizeTooSmall(31)));
    }

    #[test]
    fn decode_rejects_truncated_metadata_as_io() {
        let err = SignatureData::decode(&[0x00, 0x02, 0x00]).unwrap_err();
        assert!(matches!(err, ChunkSyncError::Io(_)));
    }

    #[test]
    fn decode_empty_signature() {
        let md = SignatureMetadata {
            chunk_size: 512,
            chunk_count: 0,
        };
        let sig = SignatureData::decode(&md.encode()).unwrap();
        assert!(sig.is_empty());
    }
}
