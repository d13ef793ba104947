pub mod job_client;
pub mod retry;
pub mod session;

pub use job_client::{
    page_count, ClientError, JobState, JobStatus, LogRecord, RemoteJob, RemoteJobClient,
    JOB_DONE_STATE,
};
pub use retry::RetryPolicy;
pub use session::SessionState;
