//! S3 sink built on the `object_store` crate.
//!
//! Credentials come from a named profile in the AWS shared credentials file
//! when one is configured, otherwise from the standard AWS environment
//! variables picked up by `AmazonS3Builder::from_env`.

use crate::artifact::Artifact;
use crate::sink::{Sink, SinkError};
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStoreSink {
    pub fn connect(
        bucket: &str,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> Result<Self, SinkError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(region) = region {
            builder = builder.with_region(region);
        }

        if let Some(profile) = profile {
            let path = shared_credentials_path().ok_or_else(|| {
                SinkError::Config("cannot locate the AWS shared credentials file".to_string())
            })?;
            let credentials = read_profile(&path, profile)?;
            builder = builder
                .with_access_key_id(credentials.access_key_id)
                .with_secret_access_key(credentials.secret_access_key);
            if let Some(token) = credentials.session_token {
                builder = builder.with_token(token);
            }
        }

        Ok(Self {
            store: Arc::new(builder.build()?),
            bucket: bucket.to_string(),
        })
    }

    /// Wrap an existing store (for testing)
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

impl std::fmt::Debug for ObjectStoreSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreSink")
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[async_trait]
impl Sink for ObjectStoreSink {
    async fn persist(&self, artifact: &Artifact) -> Result<(), SinkError> {
        let path = ObjectPath::from(artifact.key());
        self.store
            .put(&path, artifact.payload().to_vec().into())
            .await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("bucket {}", self.bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProfileCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

/// `$AWS_SHARED_CREDENTIALS_FILE` or `~/.aws/credentials`.
fn shared_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".aws").join("credentials"))
}

fn read_profile(path: &Path, profile: &str) -> Result<ProfileCredentials, SinkError> {
    let text = std::fs::read_to_string(path).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_profile(&text, profile).ok_or_else(|| {
        SinkError::Config(format!(
            "profile '{}' in {} has no aws_access_key_id/aws_secret_access_key",
            profile,
            path.display()
        ))
    })
}

fn parse_profile(text: &str, profile: &str) -> Option<ProfileCredentials> {
    let mut in_profile = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_profile = section.trim() == profile;
            continue;
        }
        if !in_profile {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().to_string();
            match key.trim() {
                "aws_access_key_id" => access_key_id = Some(value),
                "aws_secret_access_key" => secret_access_key = Some(value),
                "aws_session_token" => session_token = Some(value),
                _ => {}
            }
        }
    }

    Some(ProfileCredentials {
        access_key_id: access_key_id?,
        secret_access_key: secret_access_key?,
        session_token,
    })
}
