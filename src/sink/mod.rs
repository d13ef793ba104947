pub mod file;
pub mod remote;

use crate::artifact::Artifact;
use crate::config::SinkConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub use file::FileSink;
pub use remote::ObjectStoreSink;

/// Destination for finished artifacts.
#[async_trait]
pub trait Sink: Send + Sync + std::fmt::Debug {
    async fn persist(&self, artifact: &Artifact) -> Result<(), SinkError>;

    /// Human readable destination, used in log lines.
    fn describe(&self) -> String;
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("sink configuration error: {0}")]
    Config(String),
}

/// Which sink an export writes to. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    File {
        root: PathBuf,
    },
    ObjectStore {
        bucket: String,
        profile: Option<String>,
        region: Option<String>,
    },
}

impl SinkKind {
    /// A configured bucket selects the object store; otherwise artifacts go
    /// under `output_dir`.
    pub fn from_config(sink: &SinkConfig, output_dir: &Path) -> Self {
        match &sink.bucket {
            Some(bucket) => SinkKind::ObjectStore {
                bucket: bucket.clone(),
                profile: sink.profile.clone(),
                region: sink.region.clone(),
            },
            None => SinkKind::File {
                root: output_dir.to_path_buf(),
            },
        }
    }

    pub fn build(&self) -> Result<Arc<dyn Sink>, SinkError> {
        let sink: Arc<dyn Sink> = match self {
            SinkKind::File { root } => Arc::new(FileSink::new(root.clone())),
            SinkKind::ObjectStore {
                bucket,
                profile,
                region,
            } => Arc::new(ObjectStoreSink::connect(
                bucket,
                profile.as_deref(),
                region.as_deref(),
            )?),
        };
        Ok(sink)
    }
}
