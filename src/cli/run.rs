use crate::client::{ClientError, RemoteJobClient, SessionState};
use crate::config::types::duration_format::parse_duration;
use crate::config::{load_config, parse::validate_config, Config, ConfigError};
use crate::credentials::{load_credentials, CredentialsError};
use crate::export::{ExportCoordinator, ExportError, ExportRange, ExportSettings, ExportSummary};
use crate::sink::{SinkError, SinkKind};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Credentials(#[from] CredentialsError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Flags for the export command; each overrides the matching config value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct ExportArgs {
    /// First instant to export (YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS), UTC
    #[arg(long)]
    pub start: Option<String>,

    /// End of the export, exclusive; defaults to now
    #[arg(long)]
    pub stop: Option<String>,

    /// Window length, e.g. 5m or 1h
    #[arg(long, value_parser = parse_duration)]
    pub increment: Option<Duration>,

    /// Upload to this S3 bucket instead of the local directory
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS shared-credentials profile used for the bucket
    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    /// Directory that receives exports/ when no bucket is given
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub download_workers: Option<usize>,

    #[arg(long)]
    pub save_workers: Option<usize>,
}

impl ExportArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(increment) = self.increment {
            config.export.increment = increment;
        }
        if let Some(dir) = &self.output_dir {
            config.export.output_dir = crate::config::expand_tilde(dir);
        }
        if let Some(n) = self.download_workers {
            config.export.download_workers = n;
        }
        if let Some(n) = self.save_workers {
            config.export.save_workers = n;
        }
        if self.bucket.is_some() {
            config.sink.bucket = self.bucket.clone();
        }
        if self.profile.is_some() {
            config.sink.profile = self.profile.clone();
        }
        if self.region.is_some() {
            config.sink.region = self.region.clone();
        }
    }

    pub fn range(&self) -> ExportRange {
        ExportRange::new(self.start.clone(), self.stop.clone())
    }
}

pub async fn run(config_path: Option<PathBuf>, args: ExportArgs) -> Result<ExportSummary, RunError> {
    let mut config = match &config_path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            load_config(path)?
        }
        None => Config::default(),
    };
    args.apply(&mut config);
    validate_config(&config)?;

    let credentials = load_credentials(None)?;
    info!(access_id = %credentials.access_id, "Loaded API credentials");

    let session = Arc::new(SessionState::new(credentials));
    let client = RemoteJobClient::new(&config.api, session)?;

    let sink_kind = SinkKind::from_config(&config.sink, &config.export.output_dir);
    let sink = sink_kind.build()?;

    let settings = ExportSettings::from_config(&config.export)?;
    let coordinator = ExportCoordinator::new(settings, client, sink);

    Ok(coordinator.run(&args.range()).await?)
}
