use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{TaskHandler, TaskQueue};

/// A fixed set of background loops pulling from one [`TaskQueue`].
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Starts `concurrency` workers (at least one). They stop when `cancel` fires.
    pub fn spawn(
        queue: TaskQueue,
        handler: Arc<dyn TaskHandler>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..concurrency.max(1))
            .map(|worker_id| {
                let queue = queue.clone();
                let handler = handler.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { run_worker(worker_id, queue, handler, cancel).await })
            })
            .collect::<Vec<_>>();

        tracing::info!(workers = handles.len(), "Worker pool started");
        Self { handles, cancel }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Signals every worker and waits for in-flight tasks to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker exited abnormally");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    queue: TaskQueue,
    handler: Arc<dyn TaskHandler>,
    cancel: CancellationToken,
) {
    tracing::debug!(worker_id, "Worker started");

    while !cancel.is_cancelled() {
        match queue.run_once(handler.as_ref()).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => tracing::error!(worker_id, error = %e, "Queue poll failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = queue.wait_for_work() => {}
        }
    }

    tracing::debug!(worker_id, "Worker stopped");
}
