use crate::client::retry::RetryPolicy;
use crate::client::session::SessionState;
use crate::config::types::ApiConfig;
use crate::window::TimeWindow;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Job state reported once the service has finished collecting matches.
pub const JOB_DONE_STATE: &str = "DONE GATHERING RESULTS";

/// One search result: field name to value, forwarded untouched.
pub type LogRecord = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("search API returned status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("search job {id} is not finished (state: {state})")]
    JobNotReady { id: String, state: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Creating,
    Polling,
    Ready,
    Paginating,
    Done,
}

/// One remote search job, owned by the worker driving it.
#[derive(Debug)]
pub struct RemoteJob {
    window: TimeWindow,
    handle: Option<String>,
    state: JobState,
    total_count: Option<u64>,
}

impl RemoteJob {
    fn new(window: TimeWindow) -> Self {
        Self {
            window,
            handle: None,
            state: JobState::Creating,
            total_count: None,
        }
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Message count reported by the finished job, read exactly once.
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }
}

/// Number of page requests for `total` messages: `floor(total / page_size) + 1`,
/// or none at all for an empty job.
pub fn page_count(total: u64, page_size: u64) -> u64 {
    if total == 0 {
        0
    } else {
        total / page_size + 1
    }
}

// ===== Wire Types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest<'a> {
    query: &'a str,
    from: String,
    to: String,
    time_zone: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: String,
    #[serde(default)]
    pub message_count: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    map: LogRecord,
}

/// Client for the asynchronous search job API.
///
/// Cheap to clone; clones share the HTTP connection pool and the session.
#[derive(Debug, Clone)]
pub struct RemoteJobClient {
    endpoint: String,
    query: String,
    time_zone: String,
    page_size: u64,
    client: reqwest::Client,
    session: Arc<SessionState>,
    retry: RetryPolicy,
}

impl RemoteJobClient {
    pub fn new(config: &ApiConfig, session: Arc<SessionState>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            query: config.query(),
            time_zone: config.time_zone.clone(),
            page_size: config.page_size,
            client,
            session,
            retry: RetryPolicy::fixed(config.retry_interval),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Attach credentials and the latest session token, send, and record any
    /// token the response carries.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let credentials = self.session.credentials();
        let mut request =
            request.basic_auth(&credentials.access_id, Some(&credentials.access_key));
        if let Some(cookie) = self.session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        self.session.absorb(response.headers());
        Ok(response)
    }

    async fn expect_status(response: reqwest::Response, expected: StatusCode) -> Result<Vec<u8>> {
        let status = response.status();
        if status != expected {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Single attempt at creating a search job; returns the job id.
    pub async fn create_job(&self, window: &TimeWindow) -> Result<String> {
        let body = CreateJobRequest {
            query: &self.query,
            from: window.start_param(),
            to: window.stop_param(),
            time_zone: &self.time_zone,
        };

        let response = self.send(self.client.post(&self.endpoint).json(&body)).await?;
        let bytes = Self::expect_status(response, StatusCode::ACCEPTED).await?;
        let created: CreateJobResponse = serde_json::from_slice(&bytes)?;
        Ok(created.id)
    }

    /// Single status request for a job.
    pub async fn job_status(&self, id: &str) -> Result<JobStatus> {
        let url = format!("{}/{}", self.endpoint, id);
        let response = self.send(self.client.get(&url)).await?;
        let bytes = Self::expect_status(response, StatusCode::OK).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Single request for one page of a finished job's messages.
    pub async fn fetch_page(&self, id: &str, limit: u64, offset: u64) -> Result<Vec<LogRecord>> {
        let url = format!("{}/{}/messages", self.endpoint, id);
        let request = self
            .client
            .get(&url)
            .query(&[("limit", limit), ("offset", offset)]);
        let response = self.send(request).await?;
        let bytes = Self::expect_status(response, StatusCode::OK).await?;
        let page: MessagesResponse = serde_json::from_slice(&bytes)?;
        Ok(page.messages.into_iter().map(|m| m.map).collect())
    }

    /// Create a job for `window` and poll it until gathering is complete.
    ///
    /// Every failure is retried at the fixed interval; this only returns once
    /// the job is ready, so the returned job always has a handle and a count.
    pub async fn run_job(&self, window: &TimeWindow) -> RemoteJob {
        let mut job = RemoteJob::new(*window);

        let id = self
            .retry
            .run("create search job", move || self.create_job(window))
            .await;
        debug!(window = %window, job_id = %id, "Search job created");
        job.state = JobState::Polling;

        let total = {
            let id = id.as_str();
            self.retry
                .run("poll search job", move || async move {
                    let status = self.job_status(id).await?;
                    if status.state == JOB_DONE_STATE {
                        Ok(status.message_count)
                    } else {
                        Err(ClientError::JobNotReady {
                            id: id.to_string(),
                            state: status.state,
                        })
                    }
                })
                .await
        };
        debug!(job_id = %id, total, "Search job finished gathering");

        job.handle = Some(id);
        job.total_count = Some(total);
        job.state = JobState::Ready;
        job
    }

    /// Lazily page through a ready job's messages in order.
    ///
    /// Pages are requested one after another, each retried until it succeeds.
    /// The job is `Paginating` while pages remain and `Done` once the stream
    /// ends; an empty job yields nothing.
    pub fn records<'a>(&'a self, job: &'a mut RemoteJob) -> impl Stream<Item = LogRecord> + 'a {
        let total = job.total_count.unwrap_or(0);
        let pages = if job.handle.is_some() {
            page_count(total, self.page_size)
        } else {
            0
        };

        stream::unfold((job, 0u64), move |(job, page)| async move {
            if page >= pages {
                job.state = JobState::Done;
                debug!(window = %job.window, pages, "Search job paging complete");
                return None;
            }
            job.state = JobState::Paginating;

            let id = job.handle.clone().unwrap_or_default();
            let id = id.as_str();
            let limit = self.page_size;
            let offset = page * self.page_size;
            let records = self
                .retry
                .run("fetch search job page", move || self.fetch_page(id, limit, offset))
                .await;
            debug!(job_id = %id, page, offset, count = records.len(), "Fetched page");

            Some((records, (job, page + 1)))
        })
        .flat_map(stream::iter)
    }

    /// Run `window` to completion and collect every record in fetch order.
    pub async fn download(&self, window: &TimeWindow) -> Vec<LogRecord> {
        let mut job = self.run_job(window).await;
        self.records(&mut job).collect().await
    }
}
