//! Error types for the request bridge.
//!
//! # Design
//! Two families that never mix. `SubmitError` is a programming error found
//! synchronously at `submit` time, before any worker exists. `TransportError`
//! is a runtime failure of one call; it travels through the outcome and
//! reaches the receiver's `on_error`, so it is a value rather than an `Err`
//! escaping the worker.

use std::fmt;

use serde::Serialize;

use crate::http::HttpMethod;

/// Why a call never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The url did not parse or uses an unsupported scheme.
    MalformedUrl,
    /// DNS failure or the peer refused the connection.
    Connect,
    Timeout,
    /// Any other I/O failure while writing the request or reading the response.
    Io,
    /// The caller cancelled the request before delivery.
    Cancelled,
    /// No worker could be started for the request.
    WorkerUnavailable,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::MalformedUrl => "malformed url",
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Io => "i/o failure",
            TransportErrorKind::Cancelled => "cancelled",
            TransportErrorKind::WorkerUnavailable => "worker unavailable",
        };
        f.write_str(name)
    }
}

/// A call that could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed_url(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::MalformedUrl, message)
    }

    pub fn cancelled() -> Self {
        Self::new(TransportErrorKind::Cancelled, "request was cancelled")
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

/// Rejected at `submit` time; no worker was scheduled and no callback fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    EmptyUrl,
    UnknownMethod(String),
    BodyNotAllowed(HttpMethod),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::EmptyUrl => write!(f, "url must not be empty"),
            SubmitError::UnknownMethod(method) => write!(f, "unknown HTTP method: {method:?}"),
            SubmitError::BodyNotAllowed(method) => {
                write!(f, "{method} requests cannot carry a body")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// Invalid transport configuration.
#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    /// An environment variable was set but could not be interpreted.
    Env { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(err) => write!(f, "invalid config JSON: {err}"),
            ConfigError::Env { var, value } => write!(f, "invalid value for {var}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(err) => Some(err),
            ConfigError::Env { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err)
    }
}
