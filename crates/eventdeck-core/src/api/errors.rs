use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Backend unreachable, connection reset, timeout
    Network,
    /// Non-success HTTP status (other than 401)
    HttpStatus,
    /// Operation needs a token and none is present; no request was sent
    AuthRequired,
    /// Backend rejected the credentials or token (401, or `success: false` on login)
    AuthRejected,
    /// Success status but the body could not be decoded
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::AuthRequired => write!(f, "auth_required"),
            ApiErrorKind::AuthRejected => write!(f, "auth_rejected"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Error surfaced to callers. Displays only the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    /// HTTP status when the backend answered.
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn auth_required() -> Self {
        Self::new(ApiErrorKind::AuthRequired, "Authentication required")
    }

    pub fn auth_rejected(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::AuthRejected, message)
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Could not reach the events server".to_string()
        } else {
            format!("Request failed: {err}")
        };
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn parse(detail: impl fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::Parse,
            format!("Unexpected response from server: {detail}"),
        )
    }

    /// Builds an error from a non-success response.
    ///
    /// The message is the body's `message` field when present, else `fallback`.
    pub fn http_status(status: u16, body: &str, fallback: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| fallback.to_string());
        let kind = if status == 401 {
            ApiErrorKind::AuthRejected
        } else {
            ApiErrorKind::HttpStatus
        };
        Self {
            kind,
            message,
            status: Some(status),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

fn extract_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let message = json.get("message")?.as_str()?.trim();
    (!message.is_empty()).then(|| message.to_string())
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
