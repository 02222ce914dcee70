//! Reusable byte-buffer pool for chunk I/O.
//!
//! # Design
//!
//! - **Pre-allocated inventory**: all pooled buffers are allocated at
//!   construction; the steady-state acquire/release path is allocation-free.
//! - **Per-worker local queues**: a worker releasing a buffer pushes to its
//!   own queue and tends to get the same (cache-warm) buffer back.
//! - **Global fallback**: non-worker threads (the producer, tests) use the
//!   global queue.
//! - **Stealing**: when the global queue is empty, acquisition scans worker
//!   locals so buffers parked there stay reachable.
//! - **Fresh-alloc overflow**: if the whole inventory is in flight, `acquire`
//!   allocates a fresh buffer instead of blocking. Upstream backpressure (the
//!   bounded work queue) keeps this rare; overflow buffers are freed on
//!   release and never join the inventory.
//!
//! # Correctness invariants
//!
//! - Every [`BufferHandle`] returns its buffer on drop, on every exit path
//!   including unwind. There is no manual release API to forget.
//! - A buffer has exactly one owner at any time: the pool, or one handle.
//! - Pooled inventory is exactly `total_buffers` for the pool's lifetime.
//!   Handles record at acquire time whether their buffer came from the
//!   inventory; overflow allocations are freed on drop, so no release path
//!   (local queue included) can grow the inventory.
//!
//! All queues are lock-free (`ArrayQueue` CAS loops). Local queues are
//! `CachePadded` so adjacent workers' queue indices do not share cache lines.

use crate::worker_id;
use crossbeam_queue::ArrayQueue;
use crossbeam_utils::CachePadded;
use std::sync::Arc;

// ============================================================================
// Configuration
// ============================================================================

/// Buffer pool sizing.
///
/// Peak pooled memory is `total_buffers * buffer_len`. `total_buffers`
/// should be at least `workers + queue capacity` so that every worker can
/// hold one chunk while a full queue of chunks is in transit.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// Capacity of each buffer in bytes.
    pub buffer_len: usize,
    /// Number of buffers allocated up front.
    pub total_buffers: usize,
    /// Worker count, for per-worker local queues.
    pub workers: usize,
    /// Capacity of each per-worker local queue. Keep small (2-8) so one
    /// worker cannot hoard the inventory.
    pub local_queue_cap: usize,
}

impl PoolConfig {
    /// Validates sizing. Panics on zero sizes or an inventory smaller than
    /// the worker count, both of which are configuration bugs.
    pub fn validate(&self) {
        assert!(self.buffer_len > 0, "buffer_len must be > 0");
        assert!(self.total_buffers > 0, "total_buffers must be > 0");
        assert!(self.workers > 0, "workers must be > 0");
        assert!(self.local_queue_cap > 0, "local_queue_cap must be > 0");
        assert!(
            self.total_buffers >= self.workers,
            "need at least one buffer per worker"
        );
    }

    /// Peak pooled memory in bytes.
    #[inline]
    pub fn peak_memory_bytes(&self) -> usize {
        self.total_buffers.saturating_mul(self.buffer_len)
    }
}

// ============================================================================
// Pool
// ============================================================================

struct Inner {
    buffer_len: usize,
    /// Fallback queue, sized to hold the full inventory.
    global: ArrayQueue<Box<[u8]>>,
    /// Per-worker queues indexed by `worker_id::current()`.
    locals: Vec<CachePadded<ArrayQueue<Box<[u8]>>>>,
}

/// Shared handle to a fixed-inventory buffer pool.
///
/// `Clone` is cheap (`Arc`); all clones share one inventory.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

impl BufferPool {
    /// Creates the pool and allocates the entire inventory.
    ///
    /// Buffers are pre-seeded into worker local queues (up to their
    /// capacity) to avoid cold-start contention on the global queue.
    ///
    /// # Panics
    ///
    /// Panics if `cfg` is invalid.
    pub fn new(cfg: PoolConfig) -> Self {
        cfg.validate();

        let global = ArrayQueue::new(cfg.total_buffers);
        let mut locals = Vec::with_capacity(cfg.workers);
        for _ in 0..cfg.workers {
            locals.push(CachePadded::new(ArrayQueue::new(cfg.local_queue_cap)));
        }

        for _ in 0..cfg.total_buffers {
            let buf = vec![0u8; cfg.buffer_len].into_boxed_slice();
            global
                .push(buf)
                .expect("global queue sized to total_buffers");
        }

        for local in &locals {
            for _ in 0..cfg.local_queue_cap {
                match global.pop() {
                    Some(buf) => {
                        if local.push(buf).is_err() {
                            unreachable!("local queue full during pre-seeding");
                        }
                    }
                    None => break,
                }
            }
        }

        Self {
            inner: Arc::new(Inner {
                buffer_len: cfg.buffer_len,
                global,
                locals,
            }),
        }
    }

    /// Capacity of each buffer in bytes.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }

    /// Acquires a buffer of capacity at least `min_size`: worker local
    /// queue, then global, then stealing, then a fresh allocation.
    ///
    /// Requests larger than the pooled `buffer_len` (an over-long line)
    /// always get a fresh allocation. Fresh buffers are overflow: they are
    /// freed when the handle drops instead of re-pooled. Never blocks and
    /// never fails short of allocator OOM (which aborts, the fatal
    /// resource-exhaustion outcome).
    pub fn acquire(&self, min_size: usize) -> BufferHandle {
        if min_size <= self.inner.buffer_len {
            if let Some(buf) = self.try_pop_pooled() {
                return BufferHandle {
                    pool: self.clone(),
                    buf: Some(buf),
                    pooled: true,
                };
            }
        }
        let len = min_size.max(self.inner.buffer_len);
        BufferHandle {
            pool: self.clone(),
            buf: Some(vec![0u8; len].into_boxed_slice()),
            pooled: false,
        }
    }

    /// Pops a pooled buffer if any queue holds one.
    fn try_pop_pooled(&self) -> Option<Box<[u8]>> {
        if let Some(wid) = worker_id::current() {
            if let Some(local) = self.inner.locals.get(wid) {
                if let Some(buf) = local.pop() {
                    return Some(buf);
                }
            }
        }

        if let Some(buf) = self.inner.global.pop() {
            return Some(buf);
        }

        // Steal: buffers parked in other workers' locals stay reachable.
        self.inner.locals.iter().find_map(|local| local.pop())
    }

    /// Returns an inventory buffer to the releasing worker's local queue,
    /// falling back to the global queue. Only inventory buffers reach this
    /// path, so the global queue (sized to the full inventory) always has
    /// room for the fallback push.
    fn release(&self, mut buf: Box<[u8]>) {
        debug_assert_eq!(buf.len(), self.inner.buffer_len);

        if let Some(wid) = worker_id::current() {
            if let Some(local) = self.inner.locals.get(wid) {
                match local.push(buf) {
                    Ok(()) => return,
                    Err(returned) => buf = returned,
                }
            }
        }

        let _ = self.inner.global.push(buf);
    }

    /// Buffers currently available across all queues. Snapshot only; used by
    /// tests to check the inventory is restored after a run.
    pub fn available(&self) -> usize {
        let locals: usize = self.inner.locals.iter().map(|q| q.len()).sum();
        self.inner.global.len() + locals
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Exclusively owned buffer, returned to the pool on drop.
pub struct BufferHandle {
    pool: BufferPool,
    /// `Option` so `Drop` can take the buffer out.
    buf: Option<Box<[u8]>>,
    /// True if the buffer came from the pre-allocated inventory. Overflow
    /// allocations are freed on drop so the inventory cannot grow.
    pooled: bool,
}

impl BufferHandle {
    /// The whole buffer. Callers track their own valid length; bytes past it
    /// are stale content from previous use.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_deref().expect("buffer present until drop")
    }

    /// Mutable view over the whole buffer.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().expect("buffer present until drop")
    }

    /// Buffer capacity in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            if self.pooled {
                self.pool.release(buf);
            }
            // Overflow buffers fall out of scope here and are freed.
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
