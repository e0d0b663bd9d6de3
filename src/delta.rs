//! Delta computation, the delta wire codec, and delta application.
//!
//! A delta describes a new file relative to a signed reference file as an
//! ordered entry stream: either "reuse reference chunk N" or "here are raw
//! bytes". Matching is whole-chunk and any-position: a new chunk's digest
//! is looked up across the entire reference digest list, so chunk
//! reordering, deletion, and whole-chunk insertion are all detected without
//! a byte-shifting rolling search. Content shifted by a non-multiple of the
//! chunk size is not detected; that is a deliberate trade.
//!
//! Wire encoding, leading chunk size as decimal ASCII:
//!
//! ```text
//! <chunk size>|P,4,<index>N,<length>,<raw bytes>...
//! ```
//!
//! Entries concatenate with no delimiter between them. A new-chunk payload
//! is consumed by its declared length, never by scanning for separators, so
//! payload bytes may take any value.

use std::io::{Read, Seek, SeekFrom, Write};

use rustc_hash::FxHashMap;

use crate::digest::ChunkDigest;
use crate::error::{ChunkSyncError, Result};
use crate::signature::SignatureData;

const POINTER_TAG: u8 = b'P';
const NEW_CHUNK_TAG: u8 = b'N';
const FIELD_SEPARATOR: u8 = b',';
const STREAM_SEPARATOR: u8 = b'|';

/// Field-width marker carried by every pointer entry (a 4-byte index).
const POINTER_FIELD_WIDTH: u8 = b'4';

/// One delta instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaEntry {
    /// Reuse the reference-file chunk at this digest-list index.
    Pointer {
        /// Chunk position in the reference file.
        index: u32,
    },
    /// Raw bytes for content with no matching reference digest.
    NewChunk {
        /// Verbatim chunk payload.
        data: Vec<u8>,
    },
}

impl DeltaEntry {
    /// Whether this entry reuses a reference chunk.
    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer { .. })
    }

    /// Whether this entry carries raw bytes.
    #[must_use]
    pub const fn is_new_chunk(&self) -> bool {
        matches!(self, Self::NewChunk { .. })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Pointer { index } => {
                out.push(POINTER_TAG);
                out.push(FIELD_SEPARATOR);
                out.push(POINTER_FIELD_WIDTH);
                out.push(FIELD_SEPARATOR);
                out.extend_from_slice(index.to_string().as_bytes());
            }
            Self::NewChunk { data } => {
                out.push(NEW_CHUNK_TAG);
                out.push(FIELD_SEPARATOR);
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.push(FIELD_SEPARATOR);
                out.extend_from_slice(data);
            }
        }
    }
}

/// Ordered delta instruction stream.
///
/// Entry order is the reconstruction order: concatenating, per entry, either
/// the referenced reference-file chunk or the raw payload reproduces the new
/// file byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaStream {
    /// Chunk size shared with the signature the delta was computed against.
    pub chunk_size: u32,
    /// Instructions in reconstruction order.
    pub entries: Vec<DeltaEntry>,
}

impl DeltaStream {
    /// Compute a delta for new data against a parsed signature.
    ///
    /// Single sequential pass: each chunk of the new data (the final chunk
    /// may be short) is digested and matched against the entire reference
    /// digest list. The lowest matching reference index wins, and the same
    /// reference chunk may be matched any number of times. Consumes exactly
    /// `input_len` bytes from the source.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source fails or ends before `input_len`
    /// bytes.
    pub fn compute<R: Read>(
        signature: &SignatureData,
        input: &mut R,
        input_len: u64,
    ) -> Result<Self> {
        let lookup = DigestIndex::build(signature);
        let chunk_size = signature.chunk_size();

        let mut entries = Vec::new();
        let mut buf = vec![0u8; chunk_size as usize];
        let mut remaining = input_len;
        while remaining > 0 {
            let take = usize::try_from(remaining.min(u64::from(chunk_size)))
                .unwrap_or(chunk_size as usize);
            input.read_exact(&mut buf[..take])?;

            let digest = ChunkDigest::compute(&buf[..take]);
            match lookup.first_index(&digest) {
                Some(index) => entries.push(DeltaEntry::Pointer { index }),
                None => entries.push(DeltaEntry::NewChunk {
                    data: buf[..take].to_vec(),
                }),
            }
            remaining -= take as u64;
        }

        Ok(Self {
            chunk_size,
            entries,
        })
    }

    /// Encode to the canonical wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.chunk_size.to_string().as_bytes());
        out.push(STREAM_SEPARATOR);
        for entry in &self.entries {
            entry.encode_into(&mut out);
        }
        out
    }

    /// Write the canonical wire form to a stream.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn encode_to<W: Write>(&self, output: &mut W) -> Result<()> {
        output.write_all(&self.encode())?;
        Ok(())
    }

    /// Parse an encoded delta.
    ///
    /// New-chunk payloads are consumed by their declared length; tags,
    /// separators, and decimal fields are validated strictly.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkSyncError::CorruptedDelta`] for any wire-format
    /// violation.
    pub fn decode(input: &[u8]) -> Result<Self> {
        let mut pos = 0usize;

        let chunk_size = parse_decimal_terminated(input, &mut pos, STREAM_SEPARATOR, "chunk size")?;
        let chunk_size = u32::try_from(chunk_size)
            .map_err(|_| corrupted("chunk size exceeds 32 bits".to_string()))?;
        if chunk_size == 0 {
            return Err(corrupted("chunk size is zero".to_string()));
        }

        let mut entries = Vec::new();
        while pos < input.len() {
            let tag = input[pos];
            pos += 1;
            match tag {
                POINTER_TAG => {
                    expect_byte(input, &mut pos, FIELD_SEPARATOR, "pointer entry")?;
                    expect_byte(input, &mut pos, POINTER_FIELD_WIDTH, "pointer field width")?;
                    expect_byte(input, &mut pos, FIELD_SEPARATOR, "pointer entry")?;
                    let index = parse_decimal_run(input, &mut pos, "pointer index")?;
                    let index = u32::try_from(index)
                        .map_err(|_| corrupted("pointer index exceeds 32 bits".to_string()))?;
                    entries.push(DeltaEntry::Pointer { index });
                }
                NEW_CHUNK_TAG => {
                    expect_byte(input, &mut pos, FIELD_SEPARATOR, "new-chunk entry")?;
                    let len = parse_decimal_terminated(
                        input,
                        &mut pos,
                        FIELD_SEPARATOR,
                        "payload length",
                    )?;
                    let len = usize::try_from(len)
                        .map_err(|_| corrupted("payload length exceeds usize".to_string()))?;
                    let end = pos
                        .checked_add(len)
                        .filter(|&end| end <= input.len())
                        .ok_or_else(|| corrupted("new-chunk payload truncated".to_string()))?;
                    entries.push(DeltaEntry::NewChunk {
                        data: input[pos..end].to_vec(),
                    });
                    pos = end;
                }
                other => {
                    return Err(corrupted(format!("unknown entry tag {other:#04x}")));
                }
            }
        }

        Ok(Self {
            chunk_size,
            entries,
        })
    }

    /// Reconstruct the new file from the reference file and this delta.
    ///
    /// Pointer entries substitute the referenced chunk (the final reference
    /// chunk may be shorter than the chunk size); new-chunk entries copy
    /// their payload verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkSyncError::PointerOutOfRange`] if a pointer lies past
    /// the end of the reference file, or an I/O error on read/write failure.
    pub fn apply<B, W>(&self, reference: &mut B, output: &mut W) -> Result<()>
    where
        B: Read + Seek,
        W: Write,
    {
        let reference_len = reference.seek(SeekFrom::End(0))?;
        let chunk = u64::from(self.chunk_size);
        let mut buf = vec![0u8; self.chunk_size as usize];

        for entry in &self.entries {
            match entry {
                DeltaEntry::Pointer { index } => {
                    let offset = u64::from(*index) * chunk;
                    if offset >= reference_len {
                        return Err(ChunkSyncError::PointerOutOfRange {
                            index: *index,
                            chunk_count: reference_chunk_count(reference_len, chunk),
                        });
                    }
                    let take = usize::try_from((reference_len - offset).min(chunk))
                        .unwrap_or(self.chunk_size as usize);
                    reference.seek(SeekFrom::Start(offset))?;
                    reference.read_exact(&mut buf[..take])?;
                    output.write_all(&buf[..take])?;
                }
                DeltaEntry::NewChunk { data } => {
                    output.write_all(data)?;
                }
            }
        }
        Ok(())
    }

    /// Summarize the stream for reporting.
    #[must_use]
    pub fn stats(&self) -> DeltaStats {
        let pointer_entries = self.entries.iter().filter(|e| e.is_pointer()).count();
        let new_chunk_entries = self.entries.len() - pointer_entries;
        let bytes_literal = self
            .entries
            .iter()
            .map(|e| match e {
                DeltaEntry::NewChunk { data } => data.len() as u64,
                DeltaEntry::Pointer { .. } => 0,
            })
            .sum();
        DeltaStats {
            pointer_entries,
            new_chunk_entries,
            bytes_literal,
        }
    }
}

/// Digest lookup table over a signature's digest list.
///
/// Maps each digest to the lowest reference index carrying it, which keeps
/// the first-occurrence-wins matching contract while allowing O(1) lookups.
pub(crate) struct DigestIndex {
    map: FxHashMap<ChunkDigest, u32>,
}

impl DigestIndex {
    pub(crate) fn build(signature: &SignatureData) -> Self {
        let mut map = FxHashMap::default();
        for (i, digest) in signature.digests().iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)] // digest count is u32 on the wire
            map.entry(*digest).or_insert(i as u32);
        }
        Self { map }
    }

    pub(crate) fn first_index(&self, digest: &ChunkDigest) -> Option<u32> {
        self.map.get(digest).copied()
    }
}

/// Statistics from a computed or decoded delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaStats {
    /// Entries reusing a reference chunk.
    pub pointer_entries: usize,
    /// Entries carrying raw bytes.
    pub new_chunk_entries: usize,
    /// Total raw payload bytes.
    pub bytes_literal: u64,
}

impl DeltaStats {
    /// Total entry count.
    #[must_use]
    pub const fn total_entries(&self) -> usize {
        self.pointer_entries + self.new_chunk_entries
    }

    /// Fraction of entries that reuse a reference chunk (1.0 for an empty
    /// delta).
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // acceptable for ratio reporting
    pub fn reuse_ratio(&self) -> f64 {
        let total = self.total_entries();
        if total == 0 {
            return 1.0;
        }
        self.pointer_entries as f64 / total as f64
    }
}

fn corrupted(reason: String) -> ChunkSyncError {
    ChunkSyncError::CorruptedDelta(reason)
}

fn reference_chunk_count(reference_len: u64, chunk: u64) -> u32 {
    u32::try_from(reference_len.div_ceil(chunk.max(1))).unwrap_or(u32::MAX)
}

/// Parse a decimal run ending at `terminator`, consuming the terminator.
fn parse_decimal_terminated(
    input: &[u8],
    pos: &mut usize,
    terminator: u8,
    what: &str,
) -> Result<u64> {
    let value = parse_decimal_run(input, pos, what)?;
    if *pos >= input.len() || input[*pos] != terminator {
        return Err(corrupted(format!("missing separator after {what}")));
    }
    *pos += 1;
    Ok(value)
}

/// Parse a decimal run ending at the first non-digit byte (not consumed) or
/// the end of input.
fn parse_decimal_run(input: &[u8], pos: &mut usize, what: &str) -> Result<u64> {
    let start = *pos;
    let mut value: u64 = 0;
    while *pos < input.len() && input[*pos].is_ascii_digit() {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(input[*pos] - b'0')))
            .ok_or_else(|| corrupted(format!("{what} overflows")))?;
        *pos += 1;
    }
    if *pos == start {
        return Err(corrupted(format!("expected decimal {what}")));
    }
    Ok(value)
}

fn expect_byte(input: &[u8], pos: &mut usize, byte: u8, what: &str) -> Result<()> {
    if *pos >= input.len() || input[*pos] != byte {
        return Err(corrupted(format!("malformed {what}")));
    }
    *pos += 1;
    Ok(())
}
