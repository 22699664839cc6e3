use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{ErrorKind, SlurpResult};
use crate::slurp_error;

/// Completion barrier over a set of spawned tasks.
///
/// Every task is spawned with a label used for logging. [`TaskPool::wait_all`] resolves once
/// every task has finished, a panicking task does not prevent the others from being awaited.
#[derive(Debug)]
pub struct TaskPool {
    join_set: JoinSet<String>,
    panic_kind: ErrorKind,
}

impl TaskPool {
    /// Creates an empty pool whose panicked tasks are reported as `panic_kind`.
    pub fn new(panic_kind: ErrorKind) -> Self {
        Self {
            join_set: JoinSet::new(),
            panic_kind,
        }
    }

    /// Spawns `future` on the runtime and tracks it in the pool.
    pub fn spawn<F>(&mut self, label: impl Into<String>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        debug!(task = %label, "spawning task in pool");

        self.join_set.spawn(async move {
            future.await;
            label
        });
    }

    /// Returns the number of tasks not yet awaited.
    pub fn len(&self) -> usize {
        self.join_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.join_set.is_empty()
    }

    /// Waits for every task of the pool.
    ///
    /// Panics are collected and returned as a single, possibly aggregated, error once all tasks
    /// are done.
    pub async fn wait_all(mut self) -> SlurpResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(label) => {
                    debug!(task = %label, "task completed");
                }
                Err(join_err) if join_err.is_cancelled() => {
                    debug!("task was cancelled");
                }
                Err(join_err) => {
                    error!(error = %join_err, "task panicked");
                    errors.push(slurp_error!(self.panic_kind, "Task panicked", join_err));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn waits_for_every_task() {
        let completed = Arc::new(AtomicUsize::new(0));
        let mut pool = TaskPool::new(ErrorKind::SlurperPanic);
        assert!(pool.is_empty());

        for index in 0..4 {
            let completed = completed.clone();
            pool.spawn(format!("task-{index}"), async move {
                tokio::task::yield_now().await;
                completed.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(pool.len(), 4);
        assert!(!pool.is_empty());

        pool.wait_all().await.unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn panics_are_collected_after_all_tasks_finish() {
        let completed = Arc::new(AtomicUsize::new(0));
        let mut pool = TaskPool::new(ErrorKind::SlurperPanic);

        fn fail() {
            panic!("boom")
        }

        pool.spawn("panicking", async { fail() });
        let counter = completed.clone();
        pool.spawn("healthy", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = pool.wait_all().await.unwrap_err();
        assert_eq!(err.kinds(), vec![ErrorKind::SlurperPanic]);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }
}
