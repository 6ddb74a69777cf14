//! The optional tiled worker-thread dispatcher (spec.md §5, "tiled
//! scheduler"): one persistent worker pinned to each hash tile, fed jobs
//! through `crossbeam-channel`, joined at frame flush.
//!
//! The core rasterizer is single-threaded per draw list (spec.md §5); this
//! module is the one place in the crate that reaches for real OS threads,
//! grounded in the same worker-pool shape `crossbeam-channel`'s own
//! examples use: a fixed pool of long-lived threads, each with its own
//! receiver, fed through a `Sender` clone per dispatch.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::constants::{HASH_COLS, HASH_ROWS};
use crate::hasher::TileHasher;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

/// Owns `HASH_ROWS * HASH_COLS` worker threads, each pinned to one tile of
/// the hash grid for its entire lifetime. A frame dispatches a render job
/// per dirty tile (spec.md §4.10: dirtiness decided by diffing two
/// [`TileHasher`] snapshots) and calls [`TiledScheduler::flush`] to block
/// until every job dispatched this frame has completed.
///
/// Per-tile job order is preserved (each tile's jobs run on the same
/// thread, in dispatch order); cross-tile order is undefined (spec.md §5).
pub struct TiledScheduler {
    workers: Vec<Worker>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
    in_flight: usize,
}

impl TiledScheduler {
    pub fn new() -> TiledScheduler {
        let mut workers = Vec::with_capacity(HASH_ROWS * HASH_COLS);
        for _ in 0..HASH_ROWS * HASH_COLS {
            let (tx, rx) = unbounded::<Job>();
            let handle = thread::spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            });
            workers.push(Worker { tx: Some(tx), handle: Some(handle) });
        }
        let (done_tx, done_rx) = unbounded();
        TiledScheduler { workers, done_tx, done_rx, in_flight: 0 }
    }

    fn tile_index(row: usize, col: usize) -> usize {
        (row % HASH_ROWS) * HASH_COLS + (col % HASH_COLS)
    }

    /// Sends `job` to the worker pinned to `(row, col)`.
    pub fn dispatch(&mut self, row: usize, col: usize, job: impl FnOnce() + Send + 'static) {
        let idx = Self::tile_index(row, col);
        let done_tx = self.done_tx.clone();
        let wrapped: Job = Box::new(move || {
            job();
            let _ = done_tx.send(());
        });
        let tx = self.workers[idx].tx.as_ref().expect("worker channel open while TiledScheduler is alive");
        tx.send(wrapped).expect("worker thread pinned to this tile is alive");
        self.in_flight += 1;
    }

    /// Dispatches `job(row, col)` for every tile where `current` and
    /// `previous` disagree, using the hasher back end as the source of
    /// dirtiness (spec.md §5: "the scheduler computes tile dirtiness via
    /// the hasher back end, assigns tiles to workers").
    pub fn dispatch_dirty<F>(&mut self, current: &TileHasher, previous: &TileHasher, job: F)
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        for (row, col) in current.dirty_tiles(previous) {
            let job = Arc::clone(&job);
            self.dispatch(row, col, move || job(row, col));
        }
    }

    /// Blocks until every job dispatched since the last flush has
    /// completed (spec.md §5: "joins them on frame flush").
    pub fn flush(&mut self) {
        for _ in 0..self.in_flight {
            let _ = self.done_rx.recv();
        }
        self.in_flight = 0;
    }
}

impl Default for TiledScheduler {
    fn default() -> Self {
        TiledScheduler::new()
    }
}

impl Drop for TiledScheduler {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            // Dropping the sender closes this tile's channel, ending its
            // worker's `recv` loop; only then is joining guaranteed to
            // return instead of blocking on an empty channel forever.
            worker.tx.take();
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_then_flush_runs_every_job_exactly_once() {
        let mut scheduler = TiledScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for row in 0..HASH_ROWS {
            for col in 0..HASH_COLS {
                let counter = Arc::clone(&counter);
                scheduler.dispatch(row, col, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        scheduler.flush();
        assert_eq!(counter.load(Ordering::SeqCst), HASH_ROWS * HASH_COLS);
    }

    #[test]
    fn dispatch_dirty_only_touches_disagreeing_tiles() {
        use crate::color::Color;
        use crate::edge::{Edge, EdgeList};
        use crate::graphics::FillRule;
        use crate::gstate::Source;
        use crate::matrix::Transform;

        let edges = EdgeList { edges: vec![Edge { x0: 0, y0: 0, x1: 0, y1: 10, flipped: false }], bounds: Default::default() };
        let source = Source::Solid(Color::from_rgba(1.0, 0.0, 0.0, 1.0));

        let previous = TileHasher::new(800, 600);
        let mut current = TileHasher::new(800, 600);
        current.record_shape((0, 0, 5, 5), FillRule::NonZero, &source, &Transform::Identity, &edges);

        let mut scheduler = TiledScheduler::new();
        let touched = Arc::new(AtomicUsize::new(0));
        let touched_for_job = Arc::clone(&touched);
        scheduler.dispatch_dirty(&current, &previous, move |_row, _col| {
            touched_for_job.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.flush();

        assert_eq!(touched.load(Ordering::SeqCst), current.dirty_tiles(&previous).len());
    }

    #[test]
    fn scheduler_drops_cleanly_with_outstanding_workers() {
        let scheduler = TiledScheduler::new();
        drop(scheduler);
    }
}
