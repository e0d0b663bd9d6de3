//! Async streaming versions of the signature and delta operations.
//!
//! These mirrors write wire bytes incrementally to an async sink with memory
//! bounded to a single chunk buffer, which suits pipeline-driven callers
//! (the CLI, or producer/consumer pairs connected by an in-memory pipe). A
//! caller that needs to abort severs the underlying stream; the operation
//! surfaces that as an I/O error.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::delta::{DeltaStats, DigestIndex};
use crate::digest::{ChunkDigest, DIGEST_LEN};
use crate::error::{ChunkSyncError, Result};
use crate::signature::{SignatureData, SignatureMetadata};

/// Stream a reference file into an encoded signature.
///
/// Emits the metadata record first, then one digest per chunk as it is
/// computed.
///
/// # Errors
///
/// Returns [`ChunkSyncError::ChunkSizeTooSmall`] for an undersized chunk
/// size, or an I/O error if the source ends before `input_len` bytes, still
/// yields data past `input_len` bytes, or the sink fails.
pub async fn write_signature<R, W>(
    input: &mut R,
    input_len: u64,
    chunk_size: u32,
    output: &mut W,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let metadata = SignatureMetadata::for_input(input_len, chunk_size)?;
    output.write_all(&metadata.encode()).await?;

    let mut buf = vec![0u8; chunk_size as usize];
    let mut remaining = input_len;
    while remaining > 0 {
        let take =
            usize::try_from(remaining.min(u64::from(chunk_size))).unwrap_or(chunk_size as usize);
        input.read_exact(&mut buf[..take]).await?;
        output
            .write_all(ChunkDigest::compute(&buf[..take]).as_bytes())
            .await?;
        remaining -= take as u64;
    }

    let mut probe = [0u8; 1];
    if input.read(&mut probe).await? != 0 {
        return Err(ChunkSyncError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "input longer than its declared length",
        )));
    }
    output.flush().await?;
    Ok(())
}

/// Decode a signature from an async stream, with the same strict validation
/// as [`SignatureData::read_from`].
///
/// # Errors
///
/// Same contract as [`SignatureData::read_from`].
pub async fn read_signature<R>(input: &mut R) -> Result<SignatureData>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; SignatureMetadata::ENCODED_LEN];
    input.read_exact(&mut header).await?;
    let metadata = SignatureMetadata::decode(&header);
    metadata.validate()?;

    let mut digests = Vec::new();
    for found in 0..metadata.chunk_count {
        let mut buf = [0u8; DIGEST_LEN];
        match input.read_exact(&mut buf).await {
            Ok(_) => digests.push(ChunkDigest::from_bytes(buf)),
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
    if input.read(&mut probe).await? != 0 {
        return Err(ChunkSyncError::SignatureTooLarge {
            expected: metadata.chunk_count,
        });
    }

    Ok(SignatureData::from_parts(metadata, digests))
}

/// Stream new data into an encoded delta against a parsed signature.
///
/// Entries are written as they are decided; memory stays bounded to one
/// chunk buffer. Consumes exactly `input_len` bytes from the source.
///
/// # Errors
///
/// Returns an I/O error if the source ends before `input_len` bytes or the
/// sink fails.
pub async fn write_delta<R, W>(
    signature: &SignatureData,
    input: &mut R,
    input_len: u64,
    output: &mut W,
) -> Result<DeltaStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let lookup = DigestIndex::build(signature);
    let chunk_size = signature.chunk_size();

    output
        .write_all(format!("{chunk_size}|").as_bytes())
        .await?;

    let mut stats = DeltaStats {
        pointer_entries: 0,
        new_chunk_entries: 0,
        bytes_literal: 0,
    };
    let mut buf = vec![0u8; chunk_size as usize];
    let mut remaining = input_len;
    while remaining > 0 {
        let take =
            usize::try_from(remaining.min(u64::from(chunk_size))).unwrap_or(chunk_size as usize);
        input.read_exact(&mut buf[..take]).await?;

        let digest = ChunkDigest::compute(&buf[..take]);
        match lookup.first_index(&digest) {
            Some(index) => {
                output.write_all(format!("P,4,{index}").as_bytes()).await?;
                stats.pointer_entries += 1;
            }
            None => {
                output.write_all(format!("N,{take},").as_bytes()).await?;
                output.write_all(&buf[..take]).await?;
                stats.new_chunk_entries += 1;
                stats.bytes_literal += take as u64;
            }
        }
        remaining -= take as u64;
    }

    output.flush().await?;
    Ok(stats)
}
