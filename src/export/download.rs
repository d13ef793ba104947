use crate::artifact::Artifact;
use crate::client::RemoteJobClient;
use crate::queue::WorkQueue;
use crate::window::TimeWindow;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Counters shared by the download workers.
#[derive(Debug, Default)]
pub struct DownloadStats {
    pub windows_processed: AtomicUsize,
    pub empty_windows: AtomicUsize,
    pub artifacts_produced: AtomicUsize,
    pub records_downloaded: AtomicUsize,
    pub encode_failures: AtomicUsize,
    /// Encoded artifacts the save queue refused because it was closed.
    pub queue_failures: AtomicUsize,
}

/// Fixed-size pool turning windows into artifacts.
pub struct DownloadWorkerPool {
    handles: Vec<JoinHandle<()>>,
    stats: Arc<DownloadStats>,
}

impl DownloadWorkerPool {
    pub fn spawn(
        workers: usize,
        client: RemoteJobClient,
        jobs: Arc<WorkQueue<TimeWindow>>,
        saves: Arc<WorkQueue<Artifact>>,
    ) -> Self {
        let stats = Arc::new(DownloadStats::default());

        let handles = (0..workers)
            .map(|worker_id| {
                let client = client.clone();
                let jobs = jobs.clone();
                let saves = saves.clone();
                let stats = stats.clone();
                tokio::spawn(async move {
                    run_download_worker(worker_id, client, jobs, saves, stats).await
                })
            })
            .collect();

        Self { handles, stats }
    }

    pub fn stats(&self) -> &Arc<DownloadStats> {
        &self.stats
    }

    /// Wait for every worker to exit. Workers exit once the job queue is closed.
    pub async fn join(self) -> Result<Arc<DownloadStats>, tokio::task::JoinError> {
        for handle in self.handles {
            handle.await?;
        }
        Ok(self.stats)
    }
}

async fn run_download_worker(
    worker_id: usize,
    client: RemoteJobClient,
    jobs: Arc<WorkQueue<TimeWindow>>,
    saves: Arc<WorkQueue<Artifact>>,
    stats: Arc<DownloadStats>,
) {
    while let Some(window) = jobs.pop().await {
        process_window(worker_id, &client, &window, &saves, &stats).await;
        stats.windows_processed.fetch_add(1, Ordering::Relaxed);
        jobs.task_done();
    }
}

async fn process_window(
    worker_id: usize,
    client: &RemoteJobClient,
    window: &TimeWindow,
    saves: &WorkQueue<Artifact>,
    stats: &DownloadStats,
) {
    info!(worker_id, window = %window, "Processing window");

    let mut job = client.run_job(window).await;
    let total = job.total_count().unwrap_or(0);
    if total == 0 {
        info!(window = %window, "No logs found");
        stats.empty_windows.fetch_add(1, Ordering::Relaxed);
        return;
    }

    info!(window = %window, count = total, "Downloading logs");
    let records: Vec<_> = client.records(&mut job).collect().await;
    stats
        .records_downloaded
        .fetch_add(records.len(), Ordering::Relaxed);

    if records.is_empty() {
        info!(window = %window, "No logs found");
        stats.empty_windows.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // gzip level 9 over a large window is CPU bound
    let window_copy = *window;
    let encoded = tokio::task::spawn_blocking(move || Artifact::encode(&window_copy, &records)).await;

    match encoded {
        Ok(Ok(artifact)) => {
            let key = artifact.key().to_string();
            match saves.push(artifact) {
                Ok(()) => {
                    stats.artifacts_produced.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error!(window = %window, key = %key, error = %e, "Failed to queue artifact");
                    stats.queue_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(Err(e)) => {
            error!(window = %window, error = %e, "Failed to encode artifact");
            stats.encode_failures.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            error!(window = %window, error = %e, "Artifact encoder task failed");
            stats.encode_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}
