use serde::Deserialize;
use thiserror::Error;
use ureq::http::StatusCode;

/// Everything that can stop (or briefly interrupt) a job observation
#[derive(Debug, Error)]
pub enum ClipsError {
    /// No API key in the environment; raised before any request is made
    #[error("{var} environment variable is not set")]
    AuthenticationMissing { var: String },

    /// The API answered with a non-success status
    #[error("HTTP {status}: {message}")]
    RequestRejected { status: u16, message: String },

    /// The API could not be reached at all
    #[error("could not connect to the API: {0}")]
    TransientNetworkFailure(String),

    /// Waiting for the response headers took too long
    #[error("request timed out")]
    Timeout,

    /// A streamed event that is not a job snapshot
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A successful poll whose body is not a job snapshot
    #[error("unreadable response: {0}")]
    InvalidResponse(String),

    /// Any other HTTP client failure
    #[error("request failed: {0}")]
    Transport(String),

    #[error("gave up after {attempts} consecutive connection failures: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("stopped by user")]
    Cancelled,
}

impl ClipsError {
    /// Whether the failing request may be retried after a delay
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClipsError::TransientNetworkFailure(_) | ClipsError::Timeout
        )
    }

    /// Build a rejection from a non-success response body
    pub fn rejected(status: u16, body: &str) -> Self {
        ClipsError::RequestRejected {
            status,
            message: rejection_message(status, body),
        }
    }
}

impl From<ureq::Error> for ClipsError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => ClipsError::Timeout,
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed | ureq::Error::Io(_) => {
                ClipsError::TransientNetworkFailure(err.to_string())
            }
            ureq::Error::StatusCode(status) => ClipsError::rejected(status, ""),
            other => ClipsError::Transport(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

/// Pull a human readable message out of an error response
fn rejection_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message {
            return message;
        }
        for value in [parsed.detail, parsed.error].into_iter().flatten() {
            match value {
                serde_json::Value::String(s) => return s,
                serde_json::Value::Object(ref map) => {
                    if let Some(serde_json::Value::String(s)) = map.get("message") {
                        return s.clone();
                    }
                    return value.to_string();
                }
                serde_json::Value::Null => {}
                other => return other.to_string(),
            }
        }
    }

    if !body.is_empty() {
        return body.to_string();
    }

    canonical_reason(status).to_string()
}

fn canonical_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unexpected status")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_wins() {
        let err = ClipsError::rejected(400, r#"{"message": "video_urls is required"}"#);
        assert_eq!(err.to_string(), "HTTP 400: video_urls is required");
    }

    #[test]
    fn test_detail_string_and_nested_error() {
        assert_eq!(
            rejection_message(404, r#"{"detail": "Job not found"}"#),
            "Job not found"
        );
        assert_eq!(
            rejection_message(401, r#"{"error": {"message": "Invalid API key"}}"#),
            "Invalid API key"
        );
    }

    #[test]
    fn test_plain_and_empty_bodies() {
        assert_eq!(rejection_message(502, "upstream down\n"), "upstream down");
        assert_eq!(rejection_message(503, ""), "Service Unavailable");
        assert_eq!(rejection_message(405, "  "), "Method Not Allowed");
        assert_eq!(rejection_message(413, ""), "Payload Too Large");
        assert_eq!(rejection_message(799, ""), "Unexpected status");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ClipsError::TransientNetworkFailure("refused".into()).is_transient());
        assert!(ClipsError::Timeout.is_transient());
        assert!(!ClipsError::rejected(500, "boom").is_transient());
        assert!(!ClipsError::Cancelled.is_transient());
    }
}
