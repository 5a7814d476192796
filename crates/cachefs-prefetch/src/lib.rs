//! Prefetch Pool (spec §4.5)
//!
//! A small fixed-size pool of OS threads pulling read-ahead jobs off a
//! shared FIFO queue. Deliberately plain mutex+condvar, matching the rest
//! of this core's OS-threaded concurrency model rather than an async
//! runtime — prefetch jobs are blocking reads against the block store and
//! the object backend, not the sort of thing you'd want parked on a
//! reactor anyway.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    not_empty: Condvar,
    shutdown: AtomicBool,
}

/// Bounded pool of prefetch worker threads.
pub struct PrefetchPool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl PrefetchPool {
    /// Spawn `workers` OS threads pulling jobs off a shared queue.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let handles = (0..workers.max(1))
            .map(|idx| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("cachefs-prefetch-{idx}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn prefetch worker thread")
            })
            .collect();

        Self {
            shared,
            workers: handles,
        }
    }

    /// Queue a task for the next free worker. Returns a handle that can be
    /// joined to block until this specific task completes.
    pub fn enqueue(&self, task: impl FnOnce() + Send + 'static) -> JoinHandle {
        let done = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Arc::clone(&done);
        let job: Job = Box::new(move || {
            task();
            *signal.0.lock() = true;
            signal.1.notify_all();
        });

        self.shared.queue.lock().push_back(job);
        self.shared.not_empty.notify_one();
        JoinHandle { done }
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of jobs currently queued (not counting jobs already taken by
    /// a worker).
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Stop the pool. If `drain` is true, workers finish every already
    /// queued job first; otherwise the queue is discarded and workers stop
    /// as soon as they finish whatever job they're mid-run on.
    pub fn shutdown(mut self, drain: bool) {
        self.shutdown_and_join(drain);
    }

    /// Signal every worker to stop and join them. Takes `&mut self` (rather
    /// than consuming) so it can be shared between the owning `shutdown`
    /// call and `Drop`.
    fn shutdown_and_join(&mut self, drain: bool) {
        if !drain {
            self.shared.queue.lock().clear();
        }
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.not_empty.notify_all();

        for worker in std::mem::take(&mut self.workers) {
            let _ = worker.join();
        }
    }
}

impl Drop for PrefetchPool {
    /// A pool dropped without an explicit `shutdown` call (e.g. as part of
    /// a `CacheManager`'s own drop) must still stop its worker threads in
    /// bounded time per spec §5 — discard anything not yet started, let
    /// whatever job is in flight finish, then join.
    fn drop(&mut self) {
        self.shutdown_and_join(false);
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if shared.shutdown.load(Ordering::SeqCst) {
                    break None;
                }
                shared.not_empty.wait(&mut queue);
            }
        };

        match job {
            Some(job) => job(),
            None => break,
        }
    }
}

/// Handle to a single enqueued task, independent of the pool's lifetime.
pub struct JoinHandle {
    done: Arc<(Mutex<bool>, Condvar)>,
}

impl JoinHandle {
    /// Block until this task has run to completion.
    pub fn join(self) {
        let mut done = self.done.0.lock();
        while !*done {
            self.done.1.wait(&mut done);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn enqueued_task_runs_and_join_observes_completion() {
        let pool = PrefetchPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let handle = pool.enqueue(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        handle.join();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        pool.shutdown(true);
    }

    #[test]
    fn many_tasks_across_few_workers_all_complete() {
        let pool = PrefetchPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let c = Arc::clone(&counter);
                pool.enqueue(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        pool.shutdown(true);
    }

    #[test]
    fn shutdown_without_drain_does_not_hang() {
        let pool = PrefetchPool::new(1);
        for _ in 0..5 {
            pool.enqueue(|| {});
        }
        pool.shutdown(false);
    }

    #[test]
    fn worker_count_matches_requested_size() {
        let pool = PrefetchPool::new(3);
        assert_eq!(pool.worker_count(), 3);
        pool.shutdown(true);
    }

    #[test]
    fn dropping_the_pool_without_shutdown_joins_workers() {
        // Regression: a pool that is simply dropped (no explicit shutdown
        // call, the way an owning CacheManager drops) must still stop its
        // worker threads rather than leaking them blocked in `wait`.
        let pool = PrefetchPool::new(2);
        pool.enqueue(|| {}).join();
        drop(pool);
    }
}
