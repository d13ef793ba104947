use crate::artifact::Artifact;
use crate::queue::WorkQueue;
use crate::sink::Sink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Default)]
pub struct SaveStats {
    pub persisted: AtomicUsize,
    pub failed: AtomicUsize,
    pub bytes_written: AtomicUsize,
}

/// Fixed-size pool persisting artifacts through one [`Sink`].
pub struct SinkWorkerPool {
    handles: Vec<JoinHandle<()>>,
    stats: Arc<SaveStats>,
}

impl SinkWorkerPool {
    pub fn spawn(workers: usize, sink: Arc<dyn Sink>, saves: Arc<WorkQueue<Artifact>>) -> Self {
        let stats = Arc::new(SaveStats::default());

        let handles = (0..workers)
            .map(|worker_id| {
                let sink = sink.clone();
                let saves = saves.clone();
                let stats = stats.clone();
                tokio::spawn(async move { run_save_worker(worker_id, sink, saves, stats).await })
            })
            .collect();

        Self { handles, stats }
    }

    pub fn stats(&self) -> &Arc<SaveStats> {
        &self.stats
    }

    pub async fn join(self) -> Result<Arc<SaveStats>, tokio::task::JoinError> {
        for handle in self.handles {
            handle.await?;
        }
        Ok(self.stats)
    }
}

async fn run_save_worker(
    worker_id: usize,
    sink: Arc<dyn Sink>,
    saves: Arc<WorkQueue<Artifact>>,
    stats: Arc<SaveStats>,
) {
    while let Some(artifact) = saves.pop().await {
        // Failures are logged and counted, not retried
        match sink.persist(&artifact).await {
            Ok(()) => {
                info!(
                    worker_id,
                    key = %artifact.key(),
                    records = artifact.record_count(),
                    bytes = artifact.payload().len(),
                    "Saved artifact"
                );
                stats.persisted.fetch_add(1, Ordering::Relaxed);
                stats
                    .bytes_written
                    .fetch_add(artifact.payload().len(), Ordering::Relaxed);
            }
            Err(e) => {
                error!(
                    worker_id,
                    key = %artifact.key(),
                    sink = %sink.describe(),
                    error = %e,
                    "Failed to save artifact"
                );
                stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        saves.task_done();
    }
}
