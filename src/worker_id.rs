//! Thread-local worker id for pool fast-path routing.
//!
//! Workers register their id for the lifetime of their processing loop so
//! that [`BufferPool`](crate::pool::BufferPool) releases can route buffers
//! back to the releasing worker's local queue instead of the shared global
//! queue.
//!
//! # Correctness invariant
//!
//! `current()` returns `Some(id)` only on a thread that holds a live
//! [`WorkerIdGuard`]. The main thread, test threads, and any thread whose
//! guard has dropped see `None` and fall back to the global queue. The guard
//! clears the slot on drop (including unwind), so a finished worker thread
//! can never mis-route a release.

use std::cell::Cell;

const UNREGISTERED: usize = usize::MAX;

thread_local! {
    static WORKER_SLOT: Cell<usize> = const { Cell::new(UNREGISTERED) };
}

/// Registers the current thread as worker `id` until the guard drops.
///
/// Workers call this once at the top of their loop and hold the guard for
/// the whole run.
pub fn register(id: usize) -> WorkerIdGuard {
    debug_assert_ne!(id, UNREGISTERED, "worker id collides with sentinel");
    WORKER_SLOT.with(|slot| {
        debug_assert_eq!(
            slot.get(),
            UNREGISTERED,
            "thread already registered as a worker"
        );
        slot.set(id);
    });
    WorkerIdGuard { _priv: () }
}

/// Worker id of the current thread, if it is a registered worker.
#[inline]
pub fn current() -> Option<usize> {
    WORKER_SLOT.with(|slot| {
        let id = slot.get();
        (id != UNREGISTERED).then_some(id)
    })
}

/// Clears the thread's worker id when dropped.
///
/// Not `Clone`/`Copy`: one registration, one clear.
pub struct WorkerIdGuard {
    _priv: (),
}

impl Drop for WorkerIdGuard {
    fn drop(&mut self) {
        WORKER_SLOT.with(|slot| slot.set(UNREGISTERED));
    }
}
