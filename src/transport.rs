//! HTTP transport with bounded retries.
//!
//! Each call walks `attempt 0 → success | retryable → attempt 1 → … → exhausted`.
//! Status codes are classified once into [`StatusClass`]; only 503, timeouts
//! and network failures are retried. Every new URL starts with a fresh retry
//! budget.

use crate::constants::{
    API_ENDPOINT, CSV_DOWNLOAD_URL, DEFAULT_BACKOFF_UNIT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT,
};
use crate::error::{Error, Result, RetryCause};
use crate::models::PageResponse;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Connection and retry settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub csv_base_url: String,
    /// Total per-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Attempts per URL, including the first one.
    pub max_retries: u32,
    /// Delay after failed attempt `n` is `backoff_unit * 2^n`.
    pub backoff_unit: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_ENDPOINT.into(),
            csv_base_url: CSV_DOWNLOAD_URL.into(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            user_agent: concat!("edudata_rs/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ClientConfig {
    /// Delay to wait after the given failed attempt (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Raw response handed back by an [`HttpBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    Timeout(String),
    Network(String),
}

/// The minimal HTTP capability the transport needs: a GET that returns the
/// status and body, or a transport-level failure.
pub trait HttpBackend: Send + Sync {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> std::result::Result<HttpResponse, BackendError>;
}

impl<B: HttpBackend + ?Sized> HttpBackend for Arc<B> {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> std::result::Result<HttpResponse, BackendError> {
        (**self).get(url, params)
    }
}

/// `reqwest` blocking client; one connection pool per instance.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    http: HttpClient,
}

impl ReqwestBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout) // total request timeout
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::ClientInit(e.to_string()))?;
        Ok(Self { http })
    }
}

impl HttpBackend for ReqwestBackend {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> std::result::Result<HttpResponse, BackendError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                BackendError::Timeout(e.to_string())
            } else {
                BackendError::Network(e.to_string())
            }
        };
        let mut req = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !params.is_empty() {
            req = req.query(params);
        }
        let resp = req.send().map_err(classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(classify)?;
        Ok(HttpResponse { status, body })
    }
}

/// Why a request failed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    NotFound,
    ServerError,
    Status(u16),
}

/// How a status code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Fatal(FatalKind),
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => StatusClass::Success,
            404 => StatusClass::Fatal(FatalKind::NotFound),
            500 => StatusClass::Fatal(FatalKind::ServerError),
            503 => StatusClass::Retryable,
            other => StatusClass::Fatal(FatalKind::Status(other)),
        }
    }
}

/// Retrying GET on top of an [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct Transport<B> {
    backend: B,
    config: ClientConfig,
}

impl Transport<ReqwestBackend> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let backend = ReqwestBackend::new(&config)?;
        Ok(Self { backend, config })
    }
}

impl<B: HttpBackend> Transport<B> {
    pub fn with_backend(backend: B, config: ClientConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET the URL and return the body text of the first 2xx response.
    pub fn get_text(&self, url: &str, params: &[(String, String)]) -> Result<String> {
        let shown = display_url(url, params);
        let attempts = self.config.max_retries.max(1);
        let mut last = RetryCause::ServiceUnavailable;

        for attempt in 0..attempts {
            log::debug!("GET {} (attempt {}/{})", shown, attempt + 1, attempts);
            match self.backend.get(url, params) {
                Ok(resp) => match StatusClass::of(resp.status) {
                    StatusClass::Success => return Ok(resp.body),
                    StatusClass::Retryable => last = RetryCause::ServiceUnavailable,
                    StatusClass::Fatal(FatalKind::NotFound) => {
                        return Err(Error::EndpointNotFound { url: shown });
                    }
                    StatusClass::Fatal(FatalKind::ServerError) => {
                        return Err(Error::Server { url: shown });
                    }
                    StatusClass::Fatal(FatalKind::Status(status)) => {
                        return Err(Error::HttpStatus {
                            url: shown,
                            status,
                            body: resp.body,
                        });
                    }
                },
                Err(BackendError::Timeout(msg)) => last = RetryCause::Timeout(msg),
                Err(BackendError::Network(msg)) => last = RetryCause::Network(msg),
            }

            if attempt + 1 < attempts {
                let delay = self.config.backoff_delay(attempt);
                log::warn!(
                    "GET {} failed ({}); retrying in {:?}",
                    shown,
                    last,
                    delay
                );
                std::thread::sleep(delay);
            }
        }

        Err(Error::RetriesExhausted {
            url: shown,
            attempts,
            cause: last,
        })
    }

    /// GET the URL and parse the body as JSON. Malformed JSON is never retried.
    pub fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let body = self.get_text(url, params)?;
        serde_json::from_str(&body).map_err(|e| {
            Error::data(
                format!("parse JSON from {}", display_url(url, params)),
                format!("{}. The API response may be malformed", e),
            )
        })
    }

    /// GET one page of a list endpoint.
    pub fn get_page(&self, url: &str) -> Result<PageResponse> {
        let v = self.get_json(url, &[])?;
        serde_json::from_value(v)
            .map_err(|e| Error::data(format!("parse page response from {}", url), e))
    }
}

fn display_url(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let qs = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, qs)
}
