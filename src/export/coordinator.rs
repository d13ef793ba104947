use crate::artifact::Artifact;
use crate::client::RemoteJobClient;
use crate::config::ExportConfig;
use crate::export::download::DownloadWorkerPool;
use crate::export::range::{resolve_range, ExportRange, RangeError};
use crate::export::save::SinkWorkerPool;
use crate::queue::{QueueError, WorkQueue};
use crate::sink::Sink;
use crate::window::{partition, TimeWindow, WindowError};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid range: {0}")]
    Range(#[from] RangeError),

    #[error("invalid range: {0}")]
    Window(#[from] WindowError),

    #[error("invalid setting: {0}")]
    Settings(String),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Pool sizes and window shape for one export.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub increment: Duration,
    pub lookback: Duration,
    pub download_workers: usize,
    pub save_workers: usize,
}

impl ExportSettings {
    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        let to_chrono = |name: &str, d: std::time::Duration| {
            Duration::from_std(d).map_err(|e| ExportError::Settings(format!("{}: {}", name, e)))
        };

        Ok(Self {
            increment: to_chrono("increment", config.increment)?,
            lookback: to_chrono("lookback", config.lookback)?,
            download_workers: config.download_workers,
            save_workers: config.save_workers,
        })
    }
}

/// What an export did, reported once both queues have drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub windows: usize,
    pub empty_windows: usize,
    pub records: usize,
    pub artifacts_produced: usize,
    pub artifacts_saved: usize,
    pub save_failures: usize,
}

pub struct ExportCoordinator {
    settings: ExportSettings,
    client: RemoteJobClient,
    sink: Arc<dyn Sink>,
}

impl ExportCoordinator {
    pub fn new(settings: ExportSettings, client: RemoteJobClient, sink: Arc<dyn Sink>) -> Self {
        Self {
            settings,
            client,
            sink,
        }
    }

    /// Resolve the operator's bounds against the current time and export them.
    pub async fn run(&self, range: &ExportRange) -> Result<ExportSummary, ExportError> {
        let (start, stop) = resolve_range(range, self.settings.lookback, Utc::now())?;
        self.export(start, stop).await
    }

    /// Export `[start, stop)`. Returns only after every window has been
    /// processed and every produced artifact has been handed to the sink.
    pub async fn export(
        &self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<ExportSummary, ExportError> {
        if self.settings.download_workers == 0 || self.settings.save_workers == 0 {
            return Err(ExportError::Settings(
                "worker counts must be at least 1".to_string(),
            ));
        }

        let windows = partition(start, stop, self.settings.increment)?;
        info!(
            start = %start,
            stop = %stop,
            windows = windows.len(),
            sink = %self.sink.describe(),
            "Starting export"
        );

        let jobs: Arc<WorkQueue<TimeWindow>> = Arc::new(WorkQueue::new("jobs"));
        let saves: Arc<WorkQueue<Artifact>> = Arc::new(WorkQueue::new("saves"));

        for window in &windows {
            jobs.push(*window)?;
        }

        let downloads = DownloadWorkerPool::spawn(
            self.settings.download_workers,
            self.client.clone(),
            jobs.clone(),
            saves.clone(),
        );
        let savers = SinkWorkerPool::spawn(self.settings.save_workers, self.sink.clone(), saves.clone());

        // Artifacts are only pushed by download workers, so once the job queue
        // is drained the save queue can no longer grow.
        jobs.join().await;
        saves.join().await;

        jobs.close();
        saves.close();
        let download_stats = downloads.join().await?;
        let save_stats = savers.join().await?;

        let summary = ExportSummary {
            start,
            stop,
            windows: windows.len(),
            empty_windows: download_stats.empty_windows.load(Ordering::Relaxed),
            records: download_stats.records_downloaded.load(Ordering::Relaxed),
            artifacts_produced: download_stats.artifacts_produced.load(Ordering::Relaxed),
            artifacts_saved: save_stats.persisted.load(Ordering::Relaxed),
            save_failures: save_stats.failed.load(Ordering::Relaxed),
        };

        if summary.save_failures > 0 {
            warn!(failures = summary.save_failures, "Some artifacts could not be saved");
        }
        info!(
            windows = summary.windows,
            records = summary.records,
            artifacts = summary.artifacts_saved,
            "Export complete"
        );

        Ok(summary)
    }
}
