//! Blocking execution of a single HTTP call.
//!
//! # Design
//! A `Transport` turns one `HttpRequest` into one `Outcome` and never fails
//! any other way: url problems, connection errors and read failures all come
//! back as `Outcome::TransportError`. It blocks, so the dispatcher only ever
//! calls it from a worker.
//!
//! `UreqTransport` sends `Connection: close`, so every call owns its socket
//! and releases it when the response is dropped at the end of `execute`.

use std::io;

use tracing::debug;
use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder};
use url::Url;

use crate::config::{SuccessPolicy, TransportConfig};
use crate::error::{TransportError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest};
use crate::outcome::Outcome;

pub const CONTENT_TYPE: &str = "application/json";

/// Performs one blocking HTTP call and classifies the result.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: &HttpRequest) -> Outcome;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Outcome + Send + Sync + 'static,
{
    fn execute(&self, request: &HttpRequest) -> Outcome {
        self(request)
    }
}

/// `Transport` backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    success: SuccessPolicy,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        // Status codes are data here; classification happens in `classify`.
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .timeout_connect(config.connect_timeout())
            .build()
            .new_agent();
        Self {
            agent,
            success: config.success.clone(),
        }
    }

    fn send(
        &self,
        url: &str,
        request: &HttpRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let agent = &self.agent;
        match request.method() {
            HttpMethod::Get => with_headers(agent.get(url)).call(),
            HttpMethod::Delete => with_headers(agent.delete(url)).call(),
            HttpMethod::Head => with_headers(agent.head(url)).call(),
            HttpMethod::Options => with_headers(agent.options(url)).call(),
            HttpMethod::Post => send_body(with_headers(agent.post(url)), request.body()),
            HttpMethod::Put => send_body(with_headers(agent.put(url)), request.body()),
            HttpMethod::Patch => send_body(with_headers(agent.patch(url)), request.body()),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Outcome {
        let url = match check_url(request.url()) {
            Ok(url) => url,
            Err(err) => return err.into(),
        };
        debug!(method = %request.method(), %url, "sending request");

        let mut response = match self.send(url.as_str(), request) {
            Ok(response) => response,
            Err(err) => return transport_error(err).into(),
        };
        let status = response.status();
        // The server answered; its body is read whole whatever the size.
        let bytes = match response.body_mut().with_config().limit(u64::MAX).read_to_vec() {
            Ok(bytes) => bytes,
            Err(err) => return transport_error(err).into(),
        };

        classify(
            &self.success,
            status.as_u16(),
            status.canonical_reason().unwrap_or_default().to_string(),
            join_lines(&bytes),
        )
    }
}

fn with_headers<B>(builder: RequestBuilder<B>) -> RequestBuilder<B> {
    builder
        .header("Content-Type", CONTENT_TYPE)
        .header("Connection", "close")
}

/// A missing body means nothing is written, not an empty JSON document.
fn send_body(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

/// The url must be absolute `http`/`https` with a host.
pub fn check_url(raw: &str) -> Result<Url, TransportError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| TransportError::malformed_url(format!("{raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::malformed_url(format!(
            "{raw:?}: unsupported scheme {:?}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(TransportError::malformed_url(format!("{raw:?}: missing host")));
    }
    Ok(url)
}

/// Sort a received response into `Success` or `Failure`.
pub fn classify(
    policy: &SuccessPolicy,
    status_code: u16,
    status_message: String,
    text: String,
) -> Outcome {
    if policy.is_success(status_code) {
        Outcome::Success {
            status_code,
            status_message,
            body: text,
        }
    } else {
        Outcome::Failure {
            status_code,
            status_message,
            error_body: text,
        }
    }
}

/// Decode as UTF-8 (lossy) and rejoin lines with `\n`, dropping `\r` and the
/// trailing newline. An empty stream yields an empty string.
pub fn join_lines(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .collect::<Vec<_>>()
        .join("\n")
}

fn transport_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => TransportErrorKind::MalformedUrl,
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(io_err) => io_kind(io_err.kind()),
        _ => TransportErrorKind::Io,
    };
    TransportError::new(kind, err.to_string())
}

fn io_kind(kind: io::ErrorKind) -> TransportErrorKind {
    match kind {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable => TransportErrorKind::Connect,
        io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
        _ => TransportErrorKind::Io,
    }
}
