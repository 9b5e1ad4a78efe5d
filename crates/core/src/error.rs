//! Failure taxonomy for calls against the Raindrop.io API
//!
//! Every gateway call resolves to either a typed value or one of the
//! [`ApiError`] classes below. The paginator decides what to retry based on
//! [`ApiError::is_fatal`]; the tool boundary reports [`ApiError::kind`].

use serde::Serialize;
use std::time::Duration;

/// Classified failure of a single remote call
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Credentials rejected (401/403) or missing. Never retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The service answered 429. Carries the `Retry-After` hint when present.
    #[error("Rate limited by Raindrop.io{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// 5xx, timeout or network failure. Eligible for retry.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// 2xx with a body that does not match the expected shape.
    #[error("Unexpected response shape: {0}")]
    Schema(String),

    /// Any other non-success status (404, 400, ...).
    #[error("Raindrop.io API error [{status}]: {message}")]
    Status { status: u16, message: String },
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(wait) => format!(" (retry after {}s)", wait.as_secs()),
        None => String::new(),
    }
}

/// Stable tag reported at the tool boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    RateLimited,
    Transient,
    Schema,
    Http,
    InvalidArguments,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Transient => "transient",
            ErrorKind::Schema => "schema",
            ErrorKind::Http => "http",
            ErrorKind::InvalidArguments => "invalid_arguments",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Auth(_) => ErrorKind::Auth,
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::Transient(_) => ErrorKind::Transient,
            ApiError::Schema(_) => ErrorKind::Schema,
            ApiError::Status { .. } => ErrorKind::Http,
        }
    }

    /// Fatal errors abort a whole aggregation instead of failing one page.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiError::Auth(_) | ApiError::Schema(_) | ApiError::Status { .. }
        )
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Error shape handed to MCP clients
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ApiError> for ErrorDescriptor {
    fn from(err: ApiError) -> Self {
        err.descriptor()
    }
}

/// Map an HTTP status to an error class
///
/// Returns `Ok(())` for 2xx. `retry_after` is only consulted for 429 and
/// `body` is only used to build the message.
pub fn classify_status(
    status: u16,
    retry_after: Option<Duration>,
    body: &str,
) -> Result<(), ApiError> {
    let message = summarize_body(body);

    match status {
        200..=299 => Ok(()),
        401 | 403 => {
            let hint = if message.is_empty() {
                "check RAINDROP_TOKEN"
            } else {
                message.as_str()
            };
            Err(ApiError::Auth(format!("HTTP {status}: {hint}")))
        }
        429 => Err(ApiError::RateLimited { retry_after }),
        500..=599 => Err(ApiError::Transient(format!("HTTP {status}: {message}"))),
        _ => Err(ApiError::Status { status, message }),
    }
}

/// Parse a `Retry-After` header value expressed in seconds
///
/// HTTP-date values are not supported and yield `None`, which makes the
/// caller fall back to its default wait.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn summarize_body(body: &str) -> String {
    let trimmed = body.trim();

    // Raindrop error bodies look like {"result":false,"errorMessage":"..."}
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["errorMessage", "error", "message"] {
            if let Some(msg) = value.get(key).and_then(|m| m.as_str()) {
                return msg.to_string();
            }
        }
    }

    trimmed.chars().take(200).collect()
}
