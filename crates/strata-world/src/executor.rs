//! Job execution: a threaded worker pool and a synchronous executor.
//!
//! The pool has two lanes. Disk jobs (load, save) run on a dedicated thread
//! and compute jobs (generation) run on a pool sized from the CPU count. Both
//! lanes feed one result channel that the main thread polls without blocking.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::WorldError;
use crate::jobs::{Job, JobAffinity, JobContext, JobOutcome};

/// Runs jobs and hands back their outcomes.
pub trait JobExecutor: Send {
    /// Queues a job. Ownership of the job's chunk moves to the executor.
    fn submit(&mut self, job: Job);

    /// Returns one finished outcome, if any, without blocking.
    fn poll(&mut self) -> Option<JobOutcome>;

    /// Blocks until every submitted job has finished. Outcomes stay queued
    /// for [`poll`](Self::poll).
    fn wait_idle(&self);

    /// Jobs submitted but not yet finished.
    fn in_flight(&self) -> usize;
}

// ---------------------------------------------------------------------------
// In-flight counter
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn increment(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn get(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_zero(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self
                .idle
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Decrements the counter when a worker finishes a job, even by panicking.
struct FinishGuard<'a>(&'a InFlight);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

/// Background threads split into a disk lane and a compute lane.
pub struct WorkerPool {
    disk_sender: Option<Sender<Job>>,
    compute_sender: Option<Sender<Job>>,
    result_receiver: Receiver<JobOutcome>,
    in_flight: Arc<InFlight>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts one disk thread and `compute_threads` (at least one) compute
    /// threads.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorkerSpawn`] if the OS refuses a thread.
    pub fn new(compute_threads: usize, ctx: Arc<JobContext>) -> Result<Self, WorldError> {
        let (disk_sender, disk_receiver) = unbounded::<Job>();
        let (compute_sender, compute_receiver) = unbounded::<Job>();
        let (result_sender, result_receiver) = unbounded::<JobOutcome>();
        let in_flight = Arc::new(InFlight::default());

        let mut workers = Vec::new();
        let lanes = [
            ("disk", disk_receiver, 1),
            ("compute", compute_receiver, compute_threads.max(1)),
        ];
        for (lane, receiver, count) in lanes {
            for i in 0..count {
                let receiver = receiver.clone();
                let results = result_sender.clone();
                let in_flight = Arc::clone(&in_flight);
                let ctx = Arc::clone(&ctx);

                let handle = std::thread::Builder::new()
                    .name(format!("strata-{lane}-{i}"))
                    .spawn(move || worker_loop(&receiver, &results, &in_flight, &ctx))
                    .map_err(WorldError::WorkerSpawn)?;
                workers.push(handle);
            }
        }
        tracing::info!(
            "worker pool started: 1 disk thread, {} compute threads",
            compute_threads.max(1)
        );

        Ok(Self {
            disk_sender: Some(disk_sender),
            compute_sender: Some(compute_sender),
            result_receiver,
            in_flight,
            workers,
        })
    }

    /// Leaves two cores for the main and render threads.
    pub fn default_compute_threads() -> usize {
        let cpus = num_cpus::get().max(2);
        (cpus - 2).max(1)
    }
}

fn worker_loop(
    receiver: &Receiver<Job>,
    results: &Sender<JobOutcome>,
    in_flight: &InFlight,
    ctx: &JobContext,
) {
    while let Ok(job) = receiver.recv() {
        let _finished = FinishGuard(in_flight);
        let coord = job.coord();
        let affinity = job.affinity();
        tracing::trace!("running {affinity:?} job for chunk {coord}");

        let outcome = job.run(ctx);
        if results.send(outcome).is_err() {
            // The pool is gone; nobody will read further results.
            break;
        }
    }
}

impl JobExecutor for WorkerPool {
    fn submit(&mut self, job: Job) {
        let sender = match job.affinity() {
            JobAffinity::Disk => self.disk_sender.as_ref(),
            JobAffinity::Compute => self.compute_sender.as_ref(),
        };
        let Some(sender) = sender else {
            tracing::error!("job for chunk {} submitted after shutdown", job.coord());
            return;
        };

        self.in_flight.increment();
        if let Err(err) = sender.send(job) {
            self.in_flight.decrement();
            tracing::error!("worker lane closed, dropping job for chunk {}", err.0.coord());
        }
    }

    fn poll(&mut self) -> Option<JobOutcome> {
        self.result_receiver.try_recv().ok()
    }

    fn wait_idle(&self) {
        self.in_flight.wait_zero();
    }

    fn in_flight(&self) -> usize {
        self.in_flight.get()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the lanes ends each worker's receive loop.
        self.disk_sender.take();
        self.compute_sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("a worker thread panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inline executor
// ---------------------------------------------------------------------------

/// Runs each job on the caller's thread at submit time. Outcomes are queued
/// until the next [`poll`](JobExecutor::poll).
pub struct InlineExecutor {
    ctx: Arc<JobContext>,
    completed: VecDeque<JobOutcome>,
}

impl InlineExecutor {
    /// Creates an executor running jobs against `ctx`.
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self {
            ctx,
            completed: VecDeque::new(),
        }
    }
}

impl JobExecutor for InlineExecutor {
    fn submit(&mut self, job: Job) {
        let outcome = job.run(&self.ctx);
        self.completed.push_back(outcome);
    }

    fn poll(&mut self) -> Option<JobOutcome> {
        self.completed.pop_front()
    }

    fn wait_idle(&self) {}

    fn in_flight(&self) -> usize {
        0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strata_voxel::{Chunk, ChunkCoord};

    use super::*;
    use crate::jobs::tests::test_context;
    use crate::store::{ChunkStore, MemoryChunkStore};

    fn generate_job(x: i32, y: i32) -> Job {
        Job::Generate(Box::new(Chunk::new(ChunkCoord::new(x, y))))
    }

    #[test]
    fn test_pool_completes_all_jobs() {
        let ctx = Arc::new(test_context(Arc::new(MemoryChunkStore::new())));
        let mut pool = WorkerPool::new(3, ctx).unwrap();

        for x in 0..4 {
            for y in 0..4 {
                pool.submit(generate_job(x, y));
            }
        }
        pool.wait_idle();
        assert_eq!(pool.in_flight(), 0);

        let mut coords = Vec::new();
        while let Some(outcome) = pool.poll() {
            assert!(matches!(outcome, JobOutcome::Generated(_)));
            coords.push(outcome.coord());
        }
        coords.sort();
        assert_eq!(coords.len(), 16);
        coords.dedup();
        assert_eq!(coords.len(), 16);
    }

    #[test]
    fn test_pool_routes_disk_jobs() {
        let store = Arc::new(MemoryChunkStore::new());
        let ctx = Arc::new(test_context(store.clone()));
        let mut pool = WorkerPool::new(1, ctx).unwrap();

        let coord = ChunkCoord::new(-1, 4);
        pool.submit(Job::Save(Box::new(Chunk::new(coord))));
        pool.wait_idle();

        assert!(matches!(pool.poll(), Some(JobOutcome::Saved(c)) if c == coord));
        assert!(store.exists(coord));
        assert!(pool.poll().is_none());
    }

    #[test]
    fn test_inline_executor_is_immediate() {
        let ctx = Arc::new(test_context(Arc::new(MemoryChunkStore::new())));
        let mut exec = InlineExecutor::new(ctx);
        exec.submit(generate_job(0, 0));
        exec.submit(generate_job(1, 0));
        assert_eq!(exec.in_flight(), 0);
        assert_eq!(exec.poll().unwrap().coord(), ChunkCoord::new(0, 0));
        assert_eq!(exec.poll().unwrap().coord(), ChunkCoord::new(1, 0));
        assert!(exec.poll().is_none());
    }

    #[test]
    fn test_drop_joins_workers() {
        let ctx = Arc::new(test_context(Arc::new(MemoryChunkStore::new())));
        let mut pool = WorkerPool::new(2, ctx).unwrap();
        pool.submit(generate_job(0, 0));
        drop(pool);
    }
}
