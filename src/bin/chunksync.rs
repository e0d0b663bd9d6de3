//! chunksync CLI - chunk-based signatures and deltas for file synchronization.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tracing::info;

use chunksync::{async_ops, chunk_size_for, ChunkSyncError, DeltaStream};

/// Inputs smaller than this are not worth chunking.
const MIN_INPUT_SIZE: u64 = 64;

/// chunksync - chunk-based file synchronization
#[derive(Parser)]
#[command(name = "chunksync")]
#[command(version)]
#[command(about = "Compact chunk signatures and deltas for file synchronization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a chunk signature for a reference file
    Signature {
        /// Reference file to sign
        input: PathBuf,

        /// Output signature file
        output: PathBuf,
    },

    /// Compute a delta between a signature and a new file
    Delta {
        /// Signature of the reference file
        signature: PathBuf,

        /// New version of the file
        new_file: PathBuf,

        /// Output delta file
        output: PathBuf,
    },

    /// Reconstruct a new file from a reference file and a delta
    Apply {
        /// Reference file the delta points into
        reference: PathBuf,

        /// Delta file
        delta: PathBuf,

        /// Output file (reconstructed new version)
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let started = Instant::now();

    match run(cli).await {
        Ok(()) => {
            info!("command completed in {:?}", started.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> chunksync::Result<()> {
    match cli.command {
        Commands::Signature { input, output } => run_signature(&input, &output).await,
        Commands::Delta {
            signature,
            new_file,
            output,
        } => run_delta(&signature, &new_file, &output).await,
        Commands::Apply {
            reference,
            delta,
            output,
        } => run_apply(&reference, &delta, &output),
    }
}

async fn run_signature(input: &Path, output: &Path) -> chunksync::Result<()> {
    let file = tokio::fs::File::open(input).await?;
    let input_len = file.metadata().await?.len();
    if input_len < MIN_INPUT_SIZE {
        return Err(ChunkSyncError::InputTooSmall {
            size: input_len,
            minimum: MIN_INPUT_SIZE,
        });
    }

    let chunk_size = chunk_size_for(input_len);
    info!(
        input = %input.display(),
        input_len,
        chunk_size,
        "generating signature"
    );

    let mut reader = BufReader::new(file);
    let mut writer = BufWriter::new(tokio::fs::File::create(output).await?);
    async_ops::write_signature(&mut reader, input_len, chunk_size, &mut writer).await?;
    writer.shutdown().await?;

    println!(
        "wrote signature {} ({} chunks of {} bytes)",
        output.display(),
        input_len.div_ceil(u64::from(chunk_size)),
        chunk_size
    );
    Ok(())
}

async fn run_delta(signature: &Path, new_file: &Path, output: &Path) -> chunksync::Result<()> {
    // Parse (and thereby validate) the signature before touching the new file.
    let mut sig_reader = BufReader::new(tokio::fs::File::open(signature).await?);
    let sig = async_ops::read_signature(&mut sig_reader).await?;

    let file = tokio::fs::File::open(new_file).await?;
    let input_len = file.metadata().await?.len();
    info!(
        signature = %signature.display(),
        new_file = %new_file.display(),
        input_len,
        chunk_size = sig.chunk_size(),
        "computing delta"
    );

    let mut reader = BufReader::new(file);
    let mut writer = BufWriter::new(tokio::fs::File::create(output).await?);
    let stats = async_ops::write_delta(&sig, &mut reader, input_len, &mut writer).await?;
    writer.shutdown().await?;

    println!(
        "wrote delta {} ({} entries, {} reused, {} literal bytes, {:.1}% reuse)",
        output.display(),
        stats.total_entries(),
        stats.pointer_entries,
        stats.bytes_literal,
        stats.reuse_ratio() * 100.0
    );
    Ok(())
}

fn run_apply(reference: &Path, delta: &Path, output: &Path) -> chunksync::Result<()> {
    let delta_data = std::fs::read(delta)?;
    let delta = DeltaStream::decode(&delta_data)?;
    info!(
        reference = %reference.display(),
        entries = delta.entries.len(),
        chunk_size = delta.chunk_size,
        "applying delta"
    );

    let mut reference_file = std::fs::File::open(reference)?;
    let mut writer = std::io::BufWriter::new(std::fs::File::create(output)?);
    delta.apply(&mut reference_file, &mut writer)?;
    std::io::Write::flush(&mut writer)?;

    println!("reconstructed {}", output.display());
    Ok(())
}
