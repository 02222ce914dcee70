//! Line-aligned chunking of a sequential byte stream.
//!
//! # Algorithm
//!
//! The chunker accumulates reads in a growing carry buffer. Once the carry
//! exceeds a flush threshold it scans backward for the last line terminator:
//! everything up to and including it is sendable, the remainder stays
//! carried. The sendable region may be split further to fit pooled buffers,
//! but every split point is itself a terminator position. At end of stream
//! the remaining tail is flushed as a final, possibly terminator-less chunk.
//!
//! # Invariants
//!
//! - A line present in the input is never split across two emitted chunks.
//! - Every input byte appears in exactly one chunk, in stream order.
//! - Empty chunks are never emitted.
//!
//! # I/O pattern
//!
//! Reads are sequential with no seeks. The carry buffer grows without a
//! fixed cap: a single line longer than the flush threshold simply keeps
//! accumulating until its terminator arrives (or EOF), and is emitted as one
//! oversized chunk from a one-off allocation.
//!
//! On return, success or error, the chunker drops its queue sender. That is
//! the close signal: once all in-flight chunks drain, blocked workers see
//! the channel as closed and exit.

use crate::pool::BufferPool;
use crossbeam_channel::Sender;
use memchr::{memchr, memrchr};
use std::io::{self, Read};

/// Line terminator byte.
const NEWLINE: u8 = b'\n';

/// Chunker sizing.
#[derive(Clone, Copy, Debug)]
pub struct ChunkerConfig {
    /// Bytes requested per read syscall.
    pub read_size: usize,
    /// Carry size that triggers a flush. A few read_sizes is typical; larger
    /// values amortize the backward scan, smaller ones reduce latency to
    /// first chunk.
    pub flush_threshold: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            read_size: 1024 * 1024,       // 1 MiB
            flush_threshold: 2 * 1024 * 1024, // 2 MiB
        }
    }
}

impl ChunkerConfig {
    /// Panics on zero sizes, which are configuration bugs.
    pub fn validate(&self) {
        assert!(self.read_size > 0, "read_size must be > 0");
        assert!(self.flush_threshold > 0, "flush_threshold must be > 0");
    }
}

/// A line-aligned slice of the input in transit to a worker.
///
/// Owns its pooled buffer; the valid region is `data()`. The buffer returns
/// to the pool when the chunk drops, after the owning worker has scanned it.
pub struct Chunk {
    buf: crate::pool::BufferHandle,
    len: usize,
}

impl Chunk {
    /// The valid bytes: complete lines, except possibly a terminator-less
    /// final tail of the input.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buf.as_slice()[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Counters reported by a completed chunker run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkerStats {
    /// Total bytes read from the source.
    pub bytes_read: u64,
    /// Chunks sent to the queue.
    pub chunks_sent: u64,
}

/// Sequential producer: reads a byte stream and sends line-aligned chunks.
pub struct Chunker {
    pool: BufferPool,
    config: ChunkerConfig,
}

impl Chunker {
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    pub fn new(pool: BufferPool, config: ChunkerConfig) -> Self {
        config.validate();
        Self { pool, config }
    }

    /// Drains `source`, sending line-aligned chunks until EOF or error.
    ///
    /// The sender is consumed and dropped on every exit path, closing the
    /// queue for the workers. A send failure means every receiver is gone
    /// (a worker panicked); it surfaces as `BrokenPipe`.
    pub fn run(&self, mut source: impl Read, tx: Sender<Chunk>) -> io::Result<ChunkerStats> {
        let mut carry: Vec<u8> = Vec::with_capacity(self.config.flush_threshold);
        let mut stats = ChunkerStats::default();

        loop {
            let old_len = carry.len();
            carry.resize(old_len + self.config.read_size, 0);
            let read = source.read(&mut carry[old_len..])?;
            carry.truncate(old_len + read);

            if read == 0 {
                // EOF: flush everything, terminator or not.
                self.emit_region(&carry, &tx, &mut stats)?;
                return Ok(stats);
            }
            stats.bytes_read += read as u64;

            if carry.len() > self.config.flush_threshold {
                if let Some(last_nl) = memrchr(NEWLINE, &carry) {
                    self.emit_region(&carry[..=last_nl], &tx, &mut stats)?;
                    carry.drain(..=last_nl);
                }
                // No terminator yet: keep accumulating. The carry has no
                // fixed cap so an over-long line cannot wedge the pipeline.
            }
        }
    }

    /// Sends `region` as one or more chunks, splitting only at terminator
    /// positions. `region` itself ends at a terminator, except for the final
    /// EOF tail.
    fn emit_region(
        &self,
        mut region: &[u8],
        tx: &Sender<Chunk>,
        stats: &mut ChunkerStats,
    ) -> io::Result<()> {
        let cap = self.pool.buffer_len();

        while !region.is_empty() {
            let piece_len = if region.len() <= cap {
                region.len()
            } else if let Some(nl) = memrchr(NEWLINE, &region[..cap]) {
                nl + 1
            } else {
                // First line alone exceeds a pooled buffer: emit it whole
                // from an oversized one-off allocation. If it has no
                // terminator at all, this is the EOF tail.
                match memchr(NEWLINE, region) {
                    Some(nl) => nl + 1,
                    None => region.len(),
                }
            };

            let piece = &region[..piece_len];
            let mut handle = self.pool.acquire(piece_len);
            handle.as_mut_slice()[..piece_len].copy_from_slice(piece);
            tx.send(Chunk {
                buf: handle,
                len: piece_len,
            })
            .map_err(|_| {
                io::Error::new(io::ErrorKind::BrokenPipe, "all chunk receivers disconnected")
            })?;
            stats.chunks_sent += 1;

            region = &region[piece_len..];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;
    use crossbeam_channel::bounded;
    use std::thread;

    fn pool(buffer_len: usize) -> BufferPool {
        BufferPool::new(PoolConfig {
            buffer_len,
            total_buffers: 8,
            workers: 1,
            local_queue_cap: 2,
        })
    }

    /// Runs the chunker over `input` and collects every emitted chunk.
    fn chunk_all(input: &[u8], buffer_len: usize, cfg: ChunkerConfig) -> Vec<Vec<u8>> {
        let pool = pool(buffer_len);
        let chunker = Chunker::new(pool, cfg);
        let (tx, rx) = bounded::<Chunk>(4);

        let consumer = thread::spawn(move || {
            let mut out = Vec::new();
            while let Ok(chunk) = rx.recv() {
                out.push(chunk.data().to_vec());
            }
            out
        });

        chunker.run(input, tx).unwrap();
        consumer.join().unwrap()
    }

    fn tiny_cfg() -> ChunkerConfig {
        ChunkerConfig {
            read_size: 7,
            flush_threshold: 16,
        }
    }

    #[test]
    fn concatenation_reproduces_input() {
        let input = b"alpha\nbeta\ngamma\ndelta\nepsilon\nzeta\n";
        let chunks = chunk_all(input, 32, tiny_cfg());
        let rejoined: Vec<u8> = chunks.concat();
        assert_eq!(rejoined, input);
    }

    #[test]
    fn every_chunk_ends_at_a_terminator() {
        let input = b"one\ntwo\nthree\nfour\nfive\nsix\nseven\neight\n";
        let chunks = chunk_all(input, 16, tiny_cfg());
        assert!(chunks.len() > 1, "input should span several chunks");
        for chunk in &chunks {
            assert_eq!(*chunk.last().unwrap(), b'\n');
        }
    }

    #[test]
    fn unterminated_tail_is_flushed() {
        let input = b"first\nsecond\nno trailing newline";
        let chunks = chunk_all(input, 64, tiny_cfg());
        let rejoined: Vec<u8> = chunks.concat();
        assert_eq!(rejoined, input);
        assert_eq!(
            chunks.last().map(|c| c.ends_with(b"newline")),
            Some(true)
        );
        // All chunks but the last end at a terminator.
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(*chunk.last().unwrap(), b'\n');
        }
    }

    #[test]
    fn empty_input_emits_nothing() {
        let chunks = chunk_all(b"", 64, tiny_cfg());
        assert!(chunks.is_empty());
    }

    #[test]
    fn line_longer_than_pooled_buffer_stays_whole() {
        // One 100-byte line against 16-byte pooled buffers.
        let mut input = vec![b'x'; 99];
        input.push(b'\n');
        input.extend_from_slice(b"short\n");

        let chunks = chunk_all(&input, 16, tiny_cfg());
        let rejoined: Vec<u8> = chunks.concat();
        assert_eq!(rejoined, input);
        // The long line arrives unsplit.
        assert_eq!(chunks[0].len(), 100);
    }

    #[test]
    fn no_line_is_split_across_chunks() {
        let input: Vec<u8> = (0..200)
            .flat_map(|i| format!("line-{i}\n").into_bytes())
            .collect();
        let chunks = chunk_all(&input, 32, tiny_cfg());

        for chunk in &chunks {
            // Each chunk parses as complete lines on its own.
            for line in chunk.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
                assert!(line.starts_with(b"line-"), "split line: {:?}", line);
            }
        }
    }

    #[test]
    fn stats_count_bytes_and_chunks() {
        let input = b"a\nb\nc\n";
        let pool = pool(64);
        let chunker = Chunker::new(pool, tiny_cfg());
        let (tx, rx) = bounded::<Chunk>(4);
        let consumer = thread::spawn(move || rx.iter().count());

        let stats = chunker.run(&input[..], tx).unwrap();
        let received = consumer.join().unwrap();

        assert_eq!(stats.bytes_read, 6);
        assert_eq!(stats.chunks_sent as usize, received);
    }

    #[test]
    fn read_error_propagates() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }

        let chunker = Chunker::new(pool(64), tiny_cfg());
        let (tx, rx) = bounded::<Chunk>(4);
        let err = chunker.run(FailingReader, tx).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        // Sender dropped on the error path: receiver observes close.
        assert!(rx.recv().is_err());
    }
}
