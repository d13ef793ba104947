#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use sumo_export::client::{LogRecord, RemoteJobClient, SessionState};
use sumo_export::config::ApiConfig;
use sumo_export::credentials::Credentials;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const JOBS_PATH: &str = "/api/v1/search/jobs";

/// Basic auth header for `id:key`.
pub const BASIC_AUTH: &str = "Basic aWQ6a2V5";

pub fn api_config(server: &MockServer, page_size: u64) -> ApiConfig {
    ApiConfig {
        endpoint: format!("{}{}", server.uri(), JOBS_PATH),
        page_size,
        timeout: Duration::from_secs(5),
        retry_interval: Duration::from_millis(10),
        ..ApiConfig::default()
    }
}

pub fn client(server: &MockServer, page_size: u64) -> RemoteJobClient {
    let session = Arc::new(SessionState::new(Credentials::new("id", "key")));
    RemoteJobClient::new(&api_config(server, page_size), session).unwrap()
}

pub fn record(value: Value) -> LogRecord {
    value.as_object().cloned().expect("record must be a JSON object")
}

pub fn messages(records: &[LogRecord]) -> Value {
    json!({
        "fields": [],
        "messages": records.iter().map(|r| json!({ "map": r })).collect::<Vec<_>>(),
    })
}

pub async fn mount_done_job(server: &MockServer, id: &str, count: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", JOBS_PATH, id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "DONE GATHERING RESULTS",
            "messageCount": count,
            "recordCount": 0,
            "pendingWarnings": [],
            "pendingErrors": [],
        })))
        .mount(server)
        .await;
}

pub async fn mount_page(server: &MockServer, id: &str, limit: u64, offset: u64, records: &[LogRecord]) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}/messages", JOBS_PATH, id)))
        .and(query_param("limit", limit.to_string()))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(messages(records)))
        .expect(1)
        .mount(server)
        .await;
}
