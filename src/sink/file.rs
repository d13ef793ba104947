use crate::artifact::Artifact;
use crate::sink::{Sink, SinkError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Writes artifacts to `<root>/<key>`, creating directories as needed.
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        self.root.join(artifact.key())
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn persist(&self, artifact: &Artifact) -> Result<(), SinkError> {
        let path = self.path_for(artifact);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SinkError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&path, artifact.payload())
            .await
            .map_err(|source| SinkError::Io { path, source })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}
