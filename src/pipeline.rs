//! Pipeline orchestration: producer, bounded work queue, worker pool, merge.
//!
//! # Architecture
//!
//! ```text
//! caller thread                 worker threads (P = workers)
//! ┌──────────────┐   bounded    ┌─────────────────────────────┐
//! │   Chunker    │──channel────▶│ recv → extract → local bump │ × P
//! │ (sequential) │  (cap = P)   │ (exclusive FreqTable each)  │
//! └──────────────┘              └──────────────┬──────────────┘
//!        │ drop sender = close                 │ join
//!        └──────────────────────┬──────────────┘
//!                               ▼
//!                     merge tables → top-N → Report
//! ```
//!
//! # Concurrency model
//!
//! One producer and a fixed pool of OS worker threads; the workload is
//! CPU-bound scanning plus blocking reads, so there is no async runtime.
//! The queue capacity equals the worker count, bounding in-flight chunks to
//! roughly one per worker. No ordering is required between chunks: per-key
//! addition is commutative, so any interleaving yields the same counts.
//!
//! # Correctness invariants
//!
//! - The producer and every worker are joined before the merge touches any
//!   per-worker table.
//! - A producer I/O error drops the sender; workers drain, exit, and the
//!   error propagates with no partial report.
//! - Worker tables are moved into worker closures and returned on join;
//!   nothing shares them mid-run.

use crate::chunker::{Chunk, Chunker, ChunkerConfig};
use crate::count::{top_n, FreqTable};
use crate::extract::{format_ip, TagExtractor};
use crate::pool::{BufferPool, PoolConfig};
use crate::worker_id;
use crossbeam_channel::{bounded, Receiver};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

/// Pipeline tuning.
///
/// # Sizing guidelines
///
/// - `workers`: match hardware parallelism; the default.
/// - `chunk_size`: pooled buffer capacity. 256 KiB-2 MiB typical; larger
///   chunks amortize queue hand-offs, smaller ones balance better.
/// - `queue_capacity`: in-flight chunk bound. Defaults to `workers`, making
///   peak in-flight memory ≈ `2 × workers × chunk_size` (queued + held).
/// - `pool_buffers`: defaults to `3 × workers` so neither side starves
///   before backpressure engages.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Worker thread count.
    pub workers: usize,
    /// Report length bound.
    pub top_n: usize,
    /// Pooled chunk buffer capacity in bytes.
    pub chunk_size: usize,
    /// Bytes per producer read syscall.
    pub read_size: usize,
    /// Carry bytes that trigger a producer flush.
    pub flush_threshold: usize,
    /// Work queue capacity in chunks.
    pub queue_capacity: usize,
    /// Buffers pre-allocated in the pool.
    pub pool_buffers: usize,
    /// Per-worker local queue capacity in the pool.
    pub local_queue_cap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            workers,
            top_n: 5,
            chunk_size: 1024 * 1024,          // 1 MiB
            read_size: 1024 * 1024,           // 1 MiB
            flush_threshold: 2 * 1024 * 1024, // 2 MiB
            queue_capacity: workers,
            pool_buffers: 3 * workers,
            local_queue_cap: 2,
        }
    }
}

impl PipelineConfig {
    /// Validates tuning. Panics on zero sizes, which are configuration bugs.
    pub fn validate(&self) {
        assert!(self.workers > 0, "workers must be > 0");
        assert!(self.chunk_size > 0, "chunk_size must be > 0");
        assert!(self.read_size > 0, "read_size must be > 0");
        assert!(self.flush_threshold > 0, "flush_threshold must be > 0");
        assert!(self.queue_capacity > 0, "queue_capacity must be > 0");
        assert!(self.pool_buffers >= self.workers, "pool_buffers < workers");
        assert!(self.local_queue_cap > 0, "local_queue_cap must be > 0");
        assert!(self.top_n > 0, "top_n must be > 0");
    }

    fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            buffer_len: self.chunk_size,
            total_buffers: self.pool_buffers,
            workers: self.workers,
            local_queue_cap: self.local_queue_cap,
        }
    }

    fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            read_size: self.read_size,
            flush_threshold: self.flush_threshold,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// One line of the final report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportEntry {
    /// 32-bit IP key (big-endian octet packing).
    pub key: u32,
    /// Dotted-decimal rendering of `key`.
    pub ip: String,
    /// Occurrences across the whole input.
    pub count: u64,
}

/// Result of a completed run.
#[derive(Clone, Debug)]
pub struct Report {
    /// Top entries, descending by count, ties lowest key first. At most
    /// `top_n` long.
    pub entries: Vec<ReportEntry>,
    /// Distinct IP keys seen.
    pub unique_ips: u64,
    /// Total tag matches counted.
    pub total_matches: u64,
    /// Bytes read from the source.
    pub bytes_read: u64,
    /// Chunks processed.
    pub chunks: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Worker threads used.
    pub workers: usize,
}

/// Per-worker counters, merged into the [`Report`] after join.
#[derive(Clone, Copy, Debug, Default)]
struct WorkerStats {
    chunks: u64,
    matches: u64,
}

// ============================================================================
// Entry points
// ============================================================================

/// Counts tagged IPs in the file at `path`.
///
/// Reads are buffered and sequential; the file size does not bound memory,
/// the queue capacity does.
pub fn count_file(path: impl AsRef<Path>, config: &PipelineConfig) -> io::Result<Report> {
    let file = File::open(path)?;
    count_reader(BufReader::new(file), config)
}

/// Counts tagged IPs from any sequential byte source.
///
/// The producer runs on the calling thread; `config.workers` threads
/// consume. Returns after producer and workers have fully completed and
/// their tables are merged.
pub fn count_reader(source: impl Read, config: &PipelineConfig) -> io::Result<Report> {
    config.validate();
    let started = Instant::now();

    let pool = BufferPool::new(config.pool_config());
    let (tx, rx) = bounded::<Chunk>(config.queue_capacity);

    let workers: Vec<_> = (0..config.workers)
        .map(|wid| {
            let rx = rx.clone();
            thread::Builder::new()
                .name(format!("ipfreq-worker-{wid}"))
                .spawn(move || worker_loop(wid, rx))
                .expect("spawn worker thread")
        })
        .collect();
    // Workers hold their own clones; without this drop the queue would
    // never read as closed.
    drop(rx);

    let chunker = Chunker::new(pool.clone(), config.chunker_config());
    let produced = chunker.run(source, tx);

    // Join unconditionally: on producer error the dropped sender lets
    // workers drain and exit, and no partial result escapes.
    let mut master = FreqTable::new();
    let mut totals = WorkerStats::default();
    for handle in workers {
        let (table, stats) = handle.join().expect("worker thread panicked");
        master.merge_from(&table);
        totals.chunks += stats.chunks;
        totals.matches += stats.matches;
    }

    let chunker_stats = produced?;
    debug_assert_eq!(chunker_stats.chunks_sent, totals.chunks);

    let entries = top_n(&master, config.top_n)
        .into_iter()
        .map(|(key, count)| ReportEntry {
            key,
            ip: format_ip(key),
            count,
        })
        .collect();

    Ok(Report {
        entries,
        unique_ips: master.len() as u64,
        total_matches: totals.matches,
        bytes_read: chunker_stats.bytes_read,
        chunks: totals.chunks,
        elapsed: started.elapsed(),
        workers: config.workers,
    })
}

/// Worker loop: pull chunks until the queue is closed and drained,
/// counting into an exclusively owned table.
fn worker_loop(wid: usize, rx: Receiver<Chunk>) -> (FreqTable, WorkerStats) {
    let _guard = worker_id::register(wid);
    let extractor = TagExtractor::new();
    let mut table = FreqTable::new();
    let mut stats = WorkerStats::default();

    // recv() errors exactly when the channel is closed and drained.
    while let Ok(chunk) = rx.recv() {
        stats.matches += extractor.for_each(chunk.data(), |key| table.bump(key));
        stats.chunks += 1;
        // chunk drops here, returning its buffer to the pool via the
        // worker's local queue.
    }

    (table, stats)
}
