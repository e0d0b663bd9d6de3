//! Chunk size policy.
//!
//! Larger files amortize per-chunk digest overhead with bigger chunks;
//! smaller files keep granularity fine enough to detect small edits.

/// Smallest chunk size the signature format accepts, in bytes.
///
/// Doubles as the baseline chunk size for files up to 5 MiB.
pub const MIN_CHUNK_SIZE: u32 = 512;

const MIB: u64 = 1024 * 1024;

/// Pick the chunk size for a file of the given size.
///
/// Deterministic step function, no I/O.
///
/// # Example
///
/// ```rust
/// use chunksync::chunk_size_for;
///
/// assert_eq!(chunk_size_for(1024), 512);
/// assert_eq!(chunk_size_for(200 * 1024 * 1024), 256 * 1024);
/// ```
#[must_use]
pub fn chunk_size_for(file_size: u64) -> u32 {
    if file_size <= 5 * MIB {
        MIN_CHUNK_SIZE
    } else if file_size <= 50 * MIB {
        4 * 1024
    } else if file_size <= 100 * MIB {
        64 * 1024
    } else if file_size <= 300 * MIB {
        256 * 1024
    } else if file_size <= 1024 * MIB {
        1024 * 1024
    } else {
        4 * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_for_small_files() {
        assert_eq!(chunk_size_for(0), 512);
        assert_eq!(chunk_size_for(64), 512);
        assert_eq!(chunk_size_for(5 * MIB), 512);
    }

    #[test]
    fn boundary_5_mib() {
        assert_eq!(chunk_size_for(5 * MIB), 512);
        assert_eq!(chunk_size_for(5 * MIB + 1), 4 * 1024);
    }

    #[test]
    fn boundary_50_mib() {
        assert_eq!(chunk_size_for(50 * MIB), 4 * 1024);
        assert_eq!(chunk_size_for(50 * MIB + 1), 64 * 1024);
    }

    #[test]
    fn boundary_100_mib() {
        assert_eq!(chunk_size_for(100 * MIB), 64 * 1024);
        assert_eq!(chunk_size_for(100 * MIB + 1), 256 * 1024);
    }

    #[test]
    fn boundary_300_mib() {
        assert_eq!(chunk_size_for(300 * MIB), 256 * 1024);
        assert_eq!(chunk_size_for(300 * MIB + 1), 1024 * 1024);
    }

    #[test]
    fn boundary_1_gib() {
        assert_eq!(chunk_size_for(1024 * MIB), 1024 * 1024);
        assert_eq!(chunk_size_for(1024 * MIB + 1), 4 * 1024 * 1024);
        assert_eq!(chunk_size_for(u64::MAX), 4 * 1024 * 1024);
    }

    #[test]
    fn policy_never_below_minimum() {
        for size in [0, 1, 5 * MIB, 51 * MIB, 2048 * MIB] {
            assert!(chunk_size_for(size) >= MIN_CHUNK_SIZE);
        }
    }
}
