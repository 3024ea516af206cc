//! Request description handed to the dispatcher.
//!
//! # Design
//! A request is plain owned data: it is built once on the caller's thread,
//! moved into exactly one worker, and dropped there. Validation that catches
//! programming errors (empty url, unknown verb, body on a body-less verb)
//! happens here so `submit` can fail before any worker is scheduled. Whether
//! the url actually parses is a transport concern and is reported through
//! the outcome instead.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SubmitError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether a request payload may be sent with this method.
    pub fn permits_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.trim().to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => return Err(SubmitError::UnknownMethod(s.to_string())),
        };
        Ok(method)
    }
}

/// One HTTP call described as plain data. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpRequest {
    url: String,
    method: HttpMethod,
    body: Option<String>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod, body: Option<String>) -> Result<Self, SubmitError> {
        if url.trim().is_empty() {
            return Err(SubmitError::EmptyUrl);
        }
        if body.is_some() && !method.permits_body() {
            return Err(SubmitError::BodyNotAllowed(method));
        }
        Ok(Self {
            url: url.to_string(),
            method,
            body,
        })
    }

    /// Build a request from the string-typed form used across the C ABI.
    pub fn parse(url: &str, method: &str, body: Option<&str>) -> Result<Self, SubmitError> {
        let method = method.parse()?;
        Self::new(url, method, body.map(str::to_string))
    }

    pub fn get(url: &str) -> Result<Self, SubmitError> {
        Self::new(url, HttpMethod::Get, None)
    }

    pub fn post(url: &str, body: impl Into<String>) -> Result<Self, SubmitError> {
        Self::new(url, HttpMethod::Post, Some(body.into()))
    }

    pub fn put(url: &str, body: impl Into<String>) -> Result<Self, SubmitError> {
        Self::new(url, HttpMethod::Put, Some(body.into()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!(" PUT ".parse::<HttpMethod>().unwrap(), HttpMethod::Put);
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = "FETCH".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, SubmitError::UnknownMethod(ref m) if m == "FETCH"));
    }

    #[test]
    fn method_display_matches_wire_form() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!(HttpMethod::Options.as_str(), "OPTIONS");
    }

    #[test]
    fn only_payload_methods_permit_body() {
        assert!(HttpMethod::Post.permits_body());
        assert!(HttpMethod::Put.permits_body());
        assert!(HttpMethod::Patch.permits_body());
        assert!(!HttpMethod::Get.permits_body());
        assert!(!HttpMethod::Delete.permits_body());
        assert!(!HttpMethod::Head.permits_body());
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(HttpRequest::get(""), Err(SubmitError::EmptyUrl)));
        assert!(matches!(HttpRequest::get("   "), Err(SubmitError::EmptyUrl)));
    }

    #[test]
    fn body_on_get_is_rejected() {
        let err = HttpRequest::new("http://localhost/x", HttpMethod::Get, Some("{}".into()))
            .unwrap_err();
        assert!(matches!(err, SubmitError::BodyNotAllowed(HttpMethod::Get)));
    }

    #[test]
    fn malformed_url_is_accepted_at_construction() {
        let req = HttpRequest::get("ht!tp://bad").unwrap();
        assert_eq!(req.url(), "ht!tp://bad");
    }

    #[test]
    fn parse_builds_post_with_body() {
        let req = HttpRequest::parse("http://localhost/echo", "post", Some(r#"{"a":1}"#)).unwrap();
        assert_eq!(req.method(), HttpMethod::Post);
        assert_eq!(req.body(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn parse_without_body_has_none() {
        let req = HttpRequest::parse("http://localhost/ok", "GET", None).unwrap();
        assert!(req.body().is_none());
    }

    #[test]
    fn request_serializes_method_uppercase() {
        let req = HttpRequest::put("http://localhost/echo", "x").unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["method"], "PUT");
        assert_eq!(json["body"], "x");
    }
}
