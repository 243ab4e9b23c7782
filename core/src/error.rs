//! Error types for the ClickUp API client.
//!
//! # Design
//! Every failure surfaces as a [`ClientError`]. The variants that come from the
//! server (`RateLimit`, `Accepted`, `Api`) wrap structured values that callers
//! can compare with `==` instead of inspecting strings. Foreign errors (serde,
//! I/O) are stored as rendered messages so the whole taxonomy stays plain data.
//!
//! Rendered messages always use [`sanitize_url`], so they are safe to log.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::context::CancelReason;
use crate::http::HttpMethod;
use crate::response::{Rate, Response};
use crate::transport::TransportError;

/// Replacement for secret query values in rendered URLs.
pub const REDACTED: &str = "REDACTED";

const SECRET_PARAMS: &[&str] = &["client_secret"];

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Cancelled,
    RateLimit,
    Accepted,
    Api,
    Decode,
    Encode,
}

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// `path` could not be resolved against the base URL.
    #[error("invalid request URL {path:?}: {reason}")]
    InvalidUrl { path: String, reason: String },

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Cancelled(#[from] CancelReason),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error(transparent)]
    Accepted(#[from] AcceptedError),

    #[error(transparent)]
    Api(#[from] ErrorResponse),

    /// A success response carried a body that does not match the destination.
    #[error("{method} {url}: {status} deserialization failed: {message}")]
    Decode {
        method: HttpMethod,
        url: String,
        status: u16,
        message: String,
    },

    /// Writing the raw body into a byte sink failed.
    #[error("{method} {url}: {status} writing response body failed: {message}")]
    Sink {
        method: HttpMethod,
        url: String,
        status: u16,
        message: String,
    },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Configuration(_) | ClientError::InvalidUrl { .. } => {
                ErrorKind::Configuration
            }
            ClientError::Encode(_) => ErrorKind::Encode,
            ClientError::Cancelled(_) => ErrorKind::Cancelled,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::RateLimit(_) => ErrorKind::RateLimit,
            ClientError::Accepted(_) => ErrorKind::Accepted,
            ClientError::Api(_) => ErrorKind::Api,
            ClientError::Decode { .. } | ClientError::Sink { .. } => ErrorKind::Decode,
        }
    }

    /// HTTP status for errors produced from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RateLimit(e) => Some(e.status),
            ClientError::Accepted(e) => Some(e.response.status),
            ClientError::Api(e) => Some(e.status),
            ClientError::Decode { status, .. } | ClientError::Sink { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client configuration problems. Reported before any network attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("base URL must have a trailing slash, but {0:?} does not")]
    MissingTrailingSlash(String),

    #[error("user agent {0:?} is not a valid header value")]
    InvalidUserAgent(String),
}

// ---------------------------------------------------------------------------
// Server-reported errors
// ---------------------------------------------------------------------------

/// A non-2xx response that is not a rate-limit rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub method: HttpMethod,
    pub url: Url,
    pub status: u16,
    pub message: String,
    /// Service error code (`ECODE`), e.g. `OAUTH_025`.
    pub code: Option<String>,
    pub errors: Vec<FieldError>,
    /// Only populated on certain errors such as 451.
    pub block: Option<ErrorBlock>,
    pub documentation_url: Option<String>,
    /// The raw response body.
    pub body: Bytes,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method,
            sanitize_url(&self.url),
            self.status,
            self.message
        )?;
        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }
        if !self.errors.is_empty() {
            let details: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", details.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorResponse {}

/// Detail on one field-level problem in an [`ErrorResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldError")]
pub struct FieldError {
    pub resource: String,
    pub field: String,
    pub code: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() && !self.message.is_empty() {
            return f.write_str(&self.message);
        }
        write!(
            f,
            "{} error caused by {} field on {} resource",
            self.code, self.field, self.resource
        )
    }
}

/// Field errors arrive either as objects or as bare message strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldError {
    Detailed {
        #[serde(default)]
        resource: String,
        #[serde(default)]
        field: String,
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    },
    Message(String),
}

impl From<RawFieldError> for FieldError {
    fn from(raw: RawFieldError) -> Self {
        match raw {
            RawFieldError::Detailed {
                resource,
                field,
                code,
                message,
            } => FieldError {
                resource,
                field,
                code,
                message,
            },
            RawFieldError::Message(message) => FieldError {
                message,
                ..FieldError::default()
            },
        }
    }
}

/// Further explanation for why a request was blocked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A 403 rejected because the request quota is exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitError {
    pub method: HttpMethod,
    pub url: Url,
    pub status: u16,
    pub message: String,
    /// Quota state reported with the rejection.
    pub rate: Rate,
}

impl RateLimitError {
    /// Time to wait before the quota resets, zero if already past.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        let reset = self.rate.reset?;
        Some((reset - Utc::now()).to_std().unwrap_or_default())
    }
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method,
            sanitize_url(&self.url),
            self.status,
            self.message
        )?;
        if let Some(reset) = self.rate.reset {
            write!(f, " {}", format_rate_reset(reset - Utc::now()))?;
        }
        Ok(())
    }
}

impl std::error::Error for RateLimitError {}

/// A 202: the server queued the work and has no final result yet.
///
/// Carries the raw body and the response envelope. Two values are equal when
/// their raw bodies are equal.
#[derive(Debug, Clone)]
pub struct AcceptedError {
    pub raw: Bytes,
    pub response: Response,
}

impl AcceptedError {
    pub fn response(&self) -> &Response {
        &self.response
    }
}

impl PartialEq for AcceptedError {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl fmt::Display for AcceptedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("job scheduled on ClickUp side; try again later")
    }
}

impl std::error::Error for AcceptedError {}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

/// Copy of `url` with secret query values replaced by [`REDACTED`].
///
/// Parameter order is preserved. URLs without a non-empty secret come back
/// byte-for-byte unchanged.
pub fn sanitize_url(url: &Url) -> Url {
    let has_secret = url
        .query_pairs()
        .any(|(k, v)| is_secret(&k) && !v.is_empty());
    if !has_secret {
        return url.clone();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_secret(&k) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    let mut sanitized = url.clone();
    sanitized.query_pairs_mut().clear().extend_pairs(pairs);
    sanitized
}

fn is_secret(name: &str) -> bool {
    SECRET_PARAMS.contains(&name)
}

/// Render the time until (or since) a rate-limit reset, rounded to seconds.
pub fn format_rate_reset(until: TimeDelta) -> String {
    let negative = until < TimeDelta::zero();
    let millis = until.num_milliseconds().unsigned_abs();
    let total = (millis + 500) / 1000;
    let (minutes, seconds) = (total / 60, total % 60);

    let span = if minutes > 0 {
        format!("{minutes}m{seconds:02}s")
    } else {
        format!("{seconds}s")
    };

    if negative {
        format!("[rate limit was reset {span} ago]")
    } else {
        format!("[rate reset in {span}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn sanitize_redacts_client_secret() {
        let raw = url("https://api.clickup.com/api/v2/oauth/token?client_id=abc&client_secret=s3cr3t&code=xyz");
        assert_eq!(
            sanitize_url(&raw).as_str(),
            "https://api.clickup.com/api/v2/oauth/token?client_id=abc&client_secret=REDACTED&code=xyz"
        );
        // Reproducible.
        assert_eq!(sanitize_url(&raw), sanitize_url(&raw));
    }

    #[test]
    fn sanitize_leaves_other_urls_alone() {
        let raw = url("https://api.clickup.com/api/v2/team?client_secret=&page=1");
        assert_eq!(sanitize_url(&raw), raw);
        let raw = url("https://api.clickup.com/api/v2/team");
        assert_eq!(sanitize_url(&raw), raw);
    }

    #[test]
    fn rate_reset_formatting() {
        assert_eq!(format_rate_reset(TimeDelta::seconds(65)), "[rate reset in 1m05s]");
        assert_eq!(format_rate_reset(TimeDelta::milliseconds(4_600)), "[rate reset in 5s]");
        assert_eq!(
            format_rate_reset(TimeDelta::seconds(-5)),
            "[rate limit was reset 5s ago]"
        );
        assert_eq!(format_rate_reset(TimeDelta::zero()), "[rate reset in 0s]");
    }

    #[test]
    fn field_error_accepts_string_or_object() {
        let errors: Vec<FieldError> = serde_json::from_str(
            r#"[{"resource":"Task","field":"name","code":"missing_field"},"name is required"]"#,
        )
        .unwrap();
        assert_eq!(errors[0].field, "name");
        assert_eq!(
            errors[0].to_string(),
            "missing_field error caused by name field on Task resource"
        );
        assert_eq!(errors[1].message, "name is required");
        assert_eq!(errors[1].to_string(), "name is required");
    }

    #[test]
    fn error_response_display_is_log_safe() {
        let err = ErrorResponse {
            method: HttpMethod::Post,
            url: url("https://api.clickup.com/api/v2/oauth/token?client_secret=hunter2"),
            status: 400,
            message: "Invalid code".to_string(),
            code: Some("OAUTH_014".to_string()),
            errors: Vec::new(),
            block: None,
            documentation_url: None,
            body: Bytes::new(),
        };
        let rendered = err.to_string();
        assert_eq!(
            rendered,
            "POST https://api.clickup.com/api/v2/oauth/token?client_secret=REDACTED: 400 Invalid code (OAUTH_014)"
        );
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn rate_limit_display_includes_reset() {
        let err = RateLimitError {
            method: HttpMethod::Get,
            url: url("https://api.clickup.com/api/v2/team"),
            status: 403,
            message: "Rate limit reached".to_string(),
            rate: Rate {
                limit: 100,
                remaining: 0,
                reset: Some(Utc::now() + TimeDelta::seconds(90)),
            },
        };
        let rendered = err.to_string();
        assert!(rendered.starts_with("GET https://api.clickup.com/api/v2/team: 403 Rate limit reached [rate reset in 1m"));
        assert!(err.retry_after().unwrap() <= std::time::Duration::from_secs(90));
    }

    #[test]
    fn kinds_group_variants() {
        assert_eq!(
            ClientError::from(ConfigError::MissingTrailingSlash("x".into())).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ClientError::Cancelled(CancelReason::DeadlineExceeded).kind(),
            ErrorKind::Cancelled
        );
        let sink = ClientError::Sink {
            method: HttpMethod::Get,
            url: "https://api.clickup.com/api/v2/export".into(),
            status: 200,
            message: "closed".into(),
        };
        assert_eq!(sink.kind(), ErrorKind::Decode);
        assert_eq!(sink.status(), Some(200));
    }

    #[test]
    fn decode_error_names_the_request() {
        let url = Url::parse("https://api.clickup.com/api/v2/oauth/token?client_secret=s3cret").unwrap();
        let err = ClientError::Decode {
            method: HttpMethod::Post,
            url: sanitize_url(&url).to_string(),
            status: 200,
            message: "expected value at line 1 column 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "POST https://api.clickup.com/api/v2/oauth/token?client_secret=REDACTED: 200 \
             deserialization failed: expected value at line 1 column 1"
        );
    }
}
