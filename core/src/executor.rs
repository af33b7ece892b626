//! Background execution of blocking request units.
//!
//! Each operation runs as one blocking unit on a tokio blocking pool. The
//! pool is capped at `max_background_tasks` threads; units beyond the cap
//! wait inside the pool rather than being rejected, so callers never see
//! backpressure.

use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::error::StoryError;

pub struct Executor {
    runtime: Option<Runtime>,
}

impl Executor {
    pub fn new(max_background_tasks: usize) -> Result<Self, StoryError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_background_tasks.max(1))
            .thread_name("story-worker")
            .enable_time()
            .build()
            .map_err(|e| StoryError::Config(format!("failed to start background runtime: {e}")))?;
        debug!(max_background_tasks, "background executor started");
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Run `work` on a background thread. Returns immediately.
    pub fn spawn<W>(&self, work: W)
    where
        W: FnOnce() + Send + 'static,
    {
        if let Some(runtime) = &self.runtime {
            runtime.spawn_blocking(work);
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // In-flight units keep running detached; their callbacks may still be
        // dispatched after the client is gone.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
