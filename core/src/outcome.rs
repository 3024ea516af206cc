//! The result of executing one request.
//!
//! # Design
//! `Outcome` keeps the three cases apart in the type so a caller can always
//! tell "the server answered" from "the call never completed". Receivers see
//! a flatter shape: both HTTP cases arrive as a `ResultEvent` whose optional
//! fields say which one it was, and transport errors arrive as a message.

use serde::Serialize;

use crate::error::TransportError;

/// What happened to one request. Exactly one variant per call.
///
/// `status_message` is the canonical reason phrase for `status_code`, not
/// the text the server put on its status line, and is empty for codes with
/// no registered phrase (e.g. `599`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Status in the success set; `body` is the response body, possibly empty.
    Success {
        status_code: u16,
        status_message: String,
        body: String,
    },
    /// The server answered with a status outside the success set.
    Failure {
        status_code: u16,
        status_message: String,
        error_body: String,
    },
    TransportError(TransportError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Status code, when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Outcome::Success { status_code, .. } | Outcome::Failure { status_code, .. } => {
                Some(*status_code)
            }
            Outcome::TransportError(_) => None,
        }
    }

    /// Split into the two receiver events.
    pub fn into_event(self) -> Result<ResultEvent, TransportError> {
        match self {
            Outcome::Success {
                status_code,
                status_message,
                body,
            } => Ok(ResultEvent {
                body: Some(body),
                status_code,
                status_message,
                error_body: None,
            }),
            Outcome::Failure {
                status_code,
                status_message,
                error_body,
            } => Ok(ResultEvent {
                body: None,
                status_code,
                status_message,
                error_body: Some(error_body),
            }),
            Outcome::TransportError(err) => Err(err),
        }
    }
}

impl From<TransportError> for Outcome {
    fn from(err: TransportError) -> Self {
        Outcome::TransportError(err)
    }
}

/// Payload of `Receiver::on_result`.
///
/// Exactly one of `body` and `error_body` is present: `body` for a status in
/// the success set, `error_body` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEvent {
    pub body: Option<String>,
    pub status_code: u16,
    pub status_message: String,
    pub error_body: Option<String>,
}

impl ResultEvent {
    pub fn is_success(&self) -> bool {
        self.body.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;

    #[test]
    fn success_maps_to_body_without_error_body() {
        let outcome = Outcome::Success {
            status_code: 200,
            status_message: "OK".into(),
            body: "ok".into(),
        };
        let event = outcome.into_event().unwrap();
        assert_eq!(event.body.as_deref(), Some("ok"));
        assert_eq!(event.status_code, 200);
        assert!(event.error_body.is_none());
        assert!(event.is_success());
    }

    #[test]
    fn failure_maps_to_error_body_without_body() {
        let outcome = Outcome::Failure {
            status_code: 404,
            status_message: "Not Found".into(),
            error_body: "not found".into(),
        };
        assert_eq!(outcome.status_code(), Some(404));
        let event = outcome.into_event().unwrap();
        assert!(event.body.is_none());
        assert_eq!(event.error_body.as_deref(), Some("not found"));
        assert!(!event.is_success());
    }

    #[test]
    fn empty_success_body_stays_present() {
        let outcome = Outcome::Success {
            status_code: 200,
            status_message: "OK".into(),
            body: String::new(),
        };
        let event = outcome.into_event().unwrap();
        assert_eq!(event.body.as_deref(), Some(""));
    }

    #[test]
    fn transport_error_maps_to_error_event() {
        let outcome = Outcome::from(TransportError::new(TransportErrorKind::Connect, "refused"));
        assert_eq!(outcome.status_code(), None);
        let err = outcome.into_event().unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Connect);
    }

    #[test]
    fn outcome_serialization_is_tagged() {
        let outcome = Outcome::Failure {
            status_code: 500,
            status_message: "Internal Server Error".into(),
            error_body: String::new(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["status_code"], 500);
        assert!(json.get("body").is_none());
    }
}
