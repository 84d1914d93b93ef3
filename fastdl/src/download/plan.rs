//! Chunk planning.
//!
//! Splits a file of `total_size` bytes into contiguous, non-overlapping
//! inclusive ranges that together cover `[0, total_size - 1]`.

use super::state::Chunk;

/// Output of [`plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Ranges sorted by start offset.
    pub chunks: Vec<Chunk>,
    /// Workers to spawn: `min(threads, chunks)`, never below 1.
    pub workers: usize,
    /// Set when an explicit chunk size larger than the file collapsed the
    /// plan to a single chunk and a single worker.
    pub downgraded: bool,
}

/// Plan the chunks of a file.
///
/// # Arguments
///
/// * `total_size` - Remote file size in bytes
/// * `threads` - Requested worker count (0 is treated as 1)
/// * `chunk_size_hint` - Chunk size in bytes; 0 derives it as `total_size / threads`
pub fn plan(total_size: u64, threads: usize, chunk_size_hint: u64) -> ChunkPlan {
    let threads = threads.max(1);

    if total_size == 0 {
        return ChunkPlan {
            chunks: Vec::new(),
            workers: 1,
            downgraded: false,
        };
    }

    if chunk_size_hint > total_size {
        return ChunkPlan {
            chunks: vec![Chunk::new(0, total_size - 1)],
            workers: 1,
            downgraded: true,
        };
    }

    let chunk_size = match chunk_size_hint {
        0 => match total_size / threads as u64 {
            // More threads than bytes
            0 => total_size,
            size => size,
        },
        hint => hint,
    };

    let last = total_size - 1;
    let mut chunks = Vec::with_capacity(total_size.div_ceil(chunk_size) as usize);
    let mut start = 0u64;
    while start < total_size {
        let end = start.saturating_add(chunk_size - 1).min(last);
        chunks.push(Chunk::new(start, end));
        start = end + 1;
    }

    let workers = threads.min(chunks.len()).max(1);
    ChunkPlan {
        chunks,
        workers,
        downgraded: false,
    }
}
