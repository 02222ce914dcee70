//! Parallel top-N IPv4 frequency counter for large line-delimited logs.
//!
//! ## Scope
//! This crate streams a log file of arbitrary size, extracts every
//! `ip=<dotted>;` tagged field, and reports the N most frequent addresses.
//! Memory stays bounded regardless of file size: the file never exists in
//! memory as a whole and no per-line strings are allocated.
//!
//! ## Key invariants
//! - Chunks handed to workers are line-aligned: a line is never split across
//!   two chunks, so a tagged field is always fully visible to one worker.
//! - Every byte of the input is emitted in exactly one chunk, in file order.
//! - Each worker owns its frequency table exclusively; the hot increment path
//!   has no synchronization. Tables are merged only after all workers join.
//! - In-flight memory is bounded by the work queue capacity times the chunk
//!   size; the producer blocks when workers fall behind.
//!
//! ## Pipeline flow
//! `File -> Chunker -> bounded queue -> workers (local tables) -> merge -> Report`
//!
//! ## Notable entry points
//! - [`count_file`] / [`count_reader`]: run the pipeline.
//! - [`PipelineConfig`]: worker count, chunk sizing, queue depth.
//! - [`TagExtractor`]: low-level tag scan and IP key parsing.
//! - [`BufferPool`]: reusable chunk buffers.
//!
//! ## Design trade-offs
//! IP candidates are parsed without validation: dot-separated digit runs are
//! folded into a 32-bit key and anything malformed yields a deterministic but
//! meaningless key that is counted like any other. This buys a branch-free
//! hot loop at the cost of garbage-in, garbage-counted. See [`extract`].

pub mod chunker;
pub mod count;
pub mod extract;
pub mod pipeline;
pub mod pool;
pub mod worker_id;

pub use chunker::{Chunk, Chunker, ChunkerConfig, ChunkerStats};
pub use count::{top_n, FreqTable};
pub use extract::{format_ip, TagExtractor};
pub use pipeline::{count_file, count_reader, PipelineConfig, Report, ReportEntry};
pub use pool::{BufferHandle, BufferPool, PoolConfig};
