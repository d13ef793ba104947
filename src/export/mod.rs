pub mod coordinator;
pub mod download;
pub mod range;
pub mod save;

pub use coordinator::{ExportCoordinator, ExportError, ExportSettings, ExportSummary};
pub use download::{DownloadStats, DownloadWorkerPool};
pub use range::{parse_timestamp, resolve_range, ExportRange, RangeError};
pub use save::{SaveStats, SinkWorkerPool};
