//! Delivery of outcomes onto the application's primary context.
//!
//! # Design
//! Background units never call user callbacks directly. They hand a `Job`
//! to a `Dispatcher`, which is responsible for running it on the context the
//! application designates as its main one. Hosts that already own an event
//! loop (Android `Handler`, a GUI main loop) implement `Dispatcher` or pass a
//! closure; everyone else uses `MainQueue` and drains it from their main
//! thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::warn;

/// A callback invocation waiting to run on the primary context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Dispatcher: Send + Sync {
    /// Schedule `job` on the primary context. Must not run it inline on the
    /// calling (background) thread.
    fn dispatch(&self, job: Job);
}

impl<F> Dispatcher for F
where
    F: Fn(Job) + Send + Sync,
{
    fn dispatch(&self, job: Job) {
        self(job)
    }
}

/// Queue of pending jobs drained by whichever thread the host treats as main.
pub struct MainQueue {
    tx: Sender<Job>,
    rx: Mutex<Receiver<Job>>,
}

impl MainQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Run every job already queued, without waiting. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(job) = self.next(None) {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs as they arrive until `count` have run or `timeout` elapses.
    /// Blocks on the channel between jobs.
    pub fn run_until(&self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;
        while ran < count {
            match self.next(Some(deadline)) {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Next job, waiting until `deadline` when one is given. The lock is
    /// released before the job runs, so jobs may drain the queue themselves.
    fn next(&self, deadline: Option<Instant>) -> Option<Job> {
        let rx = self.receiver();
        match deadline {
            None => rx.try_recv().ok(),
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                rx.recv_timeout(wait).ok()
            }
        }
    }

    fn receiver(&self) -> MutexGuard<'_, Receiver<Job>> {
        match self.rx.lock() {
            Ok(rx) => rx,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for MainQueue {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("main queue closed, dropping callback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn jobs_run_on_the_draining_thread() {
        let queue = Arc::new(MainQueue::new());
        let main = std::thread::current().id();
        let seen = Arc::new(Mutex::new(None));

        let worker_queue = queue.clone();
        let worker_seen = seen.clone();
        std::thread::spawn(move || {
            worker_queue.dispatch(Box::new(move || {
                *worker_seen.lock().unwrap() = Some(std::thread::current().id());
            }));
        })
        .join()
        .unwrap();

        assert!(seen.lock().unwrap().is_none(), "job ran before the queue was drained");
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(*seen.lock().unwrap(), Some(main));
    }

    #[test]
    fn run_until_waits_for_late_jobs() {
        let queue = Arc::new(MainQueue::new());
        let counter = Arc::new(AtomicUsize::new(0));
        for delay in [10u64, 30] {
            let queue = queue.clone();
            let counter = counter.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(delay));
                queue.dispatch(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            });
        }
        assert_eq!(queue.run_until(2, Duration::from_secs(5)), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn run_until_gives_up_after_timeout() {
        let queue = MainQueue::new();
        assert_eq!(queue.run_until(1, Duration::from_millis(20)), 0);
    }

    #[test]
    fn run_until_blocks_instead_of_returning_early() {
        let queue = Arc::new(MainQueue::new());
        let sender = queue.clone();
        let started = Instant::now();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            sender.dispatch(Box::new(|| {}));
        });
        assert_eq!(queue.run_until(1, Duration::from_secs(5)), 1);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn jobs_may_drain_the_queue_reentrantly() {
        let queue = Arc::new(MainQueue::new());
        let inner = queue.clone();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        queue.dispatch(Box::new(move || {
            inner.run_pending();
        }));
        queue.dispatch(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        queue.run_until(1, Duration::from_secs(1));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closures_are_dispatchers() {
        let ran = Arc::new(AtomicUsize::new(0));
        let inline = |job: Job| job();
        let counter = ran.clone();
        inline.dispatch(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
