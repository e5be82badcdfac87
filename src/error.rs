//! Error taxonomy for the client.
//!
//! Every variant names the stage or URL that failed. Use [`Error::kind`] to
//! branch on the broad class without matching every variant.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request, detected before any network call.
    Validation,
    /// The endpoint does not exist (404 or metadata lookup).
    EndpointNotFound,
    /// Network, timeout, 5xx or other HTTP failures.
    Connection,
    /// A page fetch failed in the middle of a pagination walk.
    Pagination,
    /// A response or file could not be turned into records.
    DataProcessing,
    /// The caller cancelled the request.
    Cancelled,
}

/// Last retryable failure seen before the retry budget ran out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryCause {
    #[error("service unavailable (503)")]
    ServiceUnavailable,
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("endpoint not found (404): {url}. Check that the level/source/topic combination is valid")]
    EndpointNotFound { url: String },

    #[error("server error (500): {url}. The API encountered an internal error")]
    Server { url: String },

    #[error("HTTP error {status}: {url}. Response: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("cannot initialize HTTP client: {0}")]
    ClientInit(String),

    #[error("request failed after {attempts} attempts (retries exhausted): {url}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        cause: RetryCause,
    },

    #[error("failed to fetch page {page}; {records} records already retrieved: {source}")]
    Pagination {
        page: usize,
        records: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("data processing failed ({context}): {message}")]
    DataProcessing { context: String, message: String },

    #[error("request cancelled before {stage}")]
    Cancelled { stage: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::EndpointNotFound { .. } => ErrorKind::EndpointNotFound,
            Error::Server { .. }
            | Error::HttpStatus { .. }
            | Error::ClientInit(_)
            | Error::RetriesExhausted { .. } => ErrorKind::Connection,
            Error::Pagination { .. } => ErrorKind::Pagination,
            Error::DataProcessing { .. } => ErrorKind::DataProcessing,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// The error a pagination failure wraps, or `self` for everything else.
    pub fn root(&self) -> &Error {
        match self {
            Error::Pagination { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub(crate) fn data(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::DataProcessing {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
