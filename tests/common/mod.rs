#![allow(dead_code)]

use edudata_rs::ClientConfig;
use edudata_rs::transport::{BackendError, HttpBackend, HttpResponse};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE: &str = "https://api.test/api/v1";
pub const CSV_BASE: &str = "https://api.test/csv";

/// URL and query parameters of one recorded request.
pub type Request = (String, Vec<(String, String)>);

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<HttpResponse, BackendError>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<HttpResponse, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Requested URLs in order.
    pub fn calls(&self) -> Vec<String> {
        self.requests().into_iter().map(|(url, _)| url).collect()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpBackend for ScriptedBackend {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpResponse, BackendError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), params.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Network(format!("no scripted reply for {}", url))))
    }
}

/// Config pointing at the fake host with no backoff sleep.
pub fn config() -> ClientConfig {
    ClientConfig {
        base_url: BASE.into(),
        csv_base_url: CSV_BASE.into(),
        backoff_unit: Duration::ZERO,
        ..ClientConfig::default()
    }
}

pub fn ok(body: Value) -> Result<HttpResponse, BackendError> {
    Ok(HttpResponse::new(200, body.to_string()))
}

pub fn status(code: u16, body: &str) -> Result<HttpResponse, BackendError> {
    Ok(HttpResponse::new(code, body))
}

/// A page of `n` records numbered from `start`.
pub fn page(start: usize, n: usize, count: usize, next: Option<&str>) -> Value {
    let results: Vec<Value> = (start..start + n)
        .map(|i| json!({"id": i, "year": 2020, "enrollment": i * 10}))
        .collect();
    json!({"count": count, "next": next, "previous": null, "results": results})
}
