//! Response envelope and status classification.
//!
//! # Design
//! [`check_response`] is a pure function of a buffered [`HttpResponse`]: it
//! never consumes the body, so it can run any number of times on the same
//! response and always yields equal errors. Classification order:
//!
//! 1. `202 Accepted` is an [`AcceptedError`] carrying the raw body.
//! 2. Any other 2xx is success.
//! 3. `403` with `X-RateLimit-Remaining: 0` is a [`RateLimitError`].
//! 4. Everything else is an [`ErrorResponse`], decoded best-effort. A body
//!    that fails to decode never hides the status.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AcceptedError, ClientError, ErrorBlock, ErrorResponse, FieldError, RateLimitError};
use crate::http::{
    HttpMethod, HttpResponse, HEADER_FROM_CACHE, HEADER_RATE_LIMIT, HEADER_RATE_REMAINING,
    HEADER_RATE_RESET,
};

/// Quota state reported by the rate-limit headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// When the window resets.
    pub reset: Option<DateTime<Utc>>,
}

impl Rate {
    /// Parse the rate-limit triple. `None` when no rate header is present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Rate> {
        let limit = header_str(headers, HEADER_RATE_LIMIT);
        let remaining = header_str(headers, HEADER_RATE_REMAINING);
        let reset = header_str(headers, HEADER_RATE_RESET);
        if limit.is_none() && remaining.is_none() && reset.is_none() {
            return None;
        }

        Some(Rate {
            limit: limit.and_then(|v| v.parse().ok()).unwrap_or_default(),
            remaining: remaining.and_then(|v| v.parse().ok()).unwrap_or_default(),
            reset: reset
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// What the caller gets back from a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub method: HttpMethod,
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    /// Quota snapshot; absent for cached responses and exempt calls.
    pub rate: Option<Rate>,
}

impl Response {
    /// Build the envelope for `http`. `track_rate` is false for calls that
    /// must not be treated as a live quota signal.
    pub fn new(http: &HttpResponse, track_rate: bool) -> Self {
        let from_cache = http.headers.contains_key(HEADER_FROM_CACHE);
        Self {
            method: http.method,
            url: http.url.clone(),
            status: http.status,
            headers: http.headers.clone(),
            rate: if track_rate && !from_cache {
                Rate::from_headers(&http.headers)
            } else {
                None
            },
        }
    }
}

/// Map a completed response to `Ok(())` or the matching error.
pub fn check_response(response: &HttpResponse) -> Result<(), ClientError> {
    if response.status == 202 {
        return Err(AcceptedError {
            raw: response.body.clone(),
            response: Response::new(response, true),
        }
        .into());
    }
    if (200..=299).contains(&response.status) {
        return Ok(());
    }

    let decoded = decode_error_body(&response.body);

    if response.status == 403 && response.header(HEADER_RATE_REMAINING).map(str::trim) == Some("0") {
        return Err(RateLimitError {
            method: response.method,
            url: response.url.clone(),
            status: response.status,
            message: decoded.message,
            rate: Rate::from_headers(&response.headers).unwrap_or_default(),
        }
        .into());
    }

    Err(ErrorResponse {
        method: response.method,
        url: response.url.clone(),
        status: response.status,
        message: decoded.message,
        code: decoded.code,
        errors: decoded.errors,
        block: decoded.block,
        documentation_url: decoded.documentation_url,
        body: response.body.clone(),
    }
    .into())
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "err")]
    message: String,
    #[serde(default, rename = "ECODE")]
    code: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
    #[serde(default)]
    block: Option<ErrorBlock>,
    #[serde(default)]
    documentation_url: Option<String>,
}

fn decode_error_body(body: &Bytes) -> ErrorBody {
    if let Ok(decoded) = serde_json::from_slice::<ErrorBody>(body) {
        return decoded;
    }
    ErrorBody {
        message: best_effort_message(body),
        ..ErrorBody::default()
    }
}

/// Salvage a message from a body that does not match [`ErrorBody`].
fn best_effort_message(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => ["message", "err", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .unwrap_or_default()
            .to_string(),
        Ok(serde_json::Value::String(s)) => s,
        Ok(_) => String::new(),
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;
    use crate::http::HttpRequest;

    fn response(status: u16) -> HttpResponse {
        let request = HttpRequest::new(
            HttpMethod::Get,
            Url::parse("https://api.clickup.com/api/v2/team/1/task").unwrap(),
        );
        HttpResponse::for_request(&request, status)
    }

    #[test]
    fn success_statuses_pass() {
        for status in [200, 201, 204, 206, 299] {
            assert_eq!(check_response(&response(status)), Ok(()), "status {status}");
        }
    }

    #[test]
    fn accepted_carries_exact_body() {
        let body = br#"{"job":"export","state":"queued"}"#;
        let resp = response(202).with_body(&body[..]);
        let err = check_response(&resp).unwrap_err();
        match err {
            ClientError::Accepted(accepted) => {
                assert_eq!(accepted.raw.as_ref(), body);
                assert_eq!(accepted.response().status, 202);
            }
            other => panic!("expected accepted, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_with_exhausted_quota_is_rate_limit() {
        let resp = response(403)
            .with_header("X-RateLimit-Limit", "100")
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("X-RateLimit-Reset", "1700000000")
            .with_body(r#"{"err":"Rate limit reached","ECODE":"APP_002"}"#);
        let err = check_response(&resp).unwrap_err();
        let ClientError::RateLimit(rate_limit) = err else {
            panic!("expected rate limit");
        };
        assert_eq!(rate_limit.message, "Rate limit reached");
        assert_eq!(
            rate_limit.rate,
            Rate {
                limit: 100,
                remaining: 0,
                reset: DateTime::from_timestamp(1_700_000_000, 0),
            }
        );
    }

    #[test]
    fn forbidden_with_quota_left_is_api_error() {
        let resp = response(403)
            .with_header("X-RateLimit-Remaining", "12")
            .with_body(r#"{"err":"Team not authorized","ECODE":"OAUTH_027"}"#);
        let err = check_response(&resp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn generic_error_decodes_full_shape() {
        let resp = response(422).with_body(
            r#"{
                "message": "Validation Failed",
                "errors": [{"resource":"Task","field":"name","code":"missing_field"}],
                "block": {"reason":"unavailable","created_at":"2024-03-01T10:00:00Z"},
                "documentation_url": "https://clickup.com/api"
            }"#,
        );
        let ClientError::Api(err) = check_response(&resp).unwrap_err() else {
            panic!("expected api error");
        };
        assert_eq!(err.message, "Validation Failed");
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code, "missing_field");
        let block = err.block.as_ref().unwrap();
        assert_eq!(block.reason.as_deref(), Some("unavailable"));
        assert_eq!(
            block.created_at,
            Some("2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert_eq!(err.documentation_url.as_deref(), Some("https://clickup.com/api"));
    }

    #[test]
    fn malformed_body_still_yields_error_with_status() {
        let resp = response(502).with_body("<html>Bad Gateway</html>\n");
        let ClientError::Api(err) = check_response(&resp).unwrap_err() else {
            panic!("expected api error");
        };
        assert_eq!(err.status, 502);
        assert_eq!(err.message, "<html>Bad Gateway</html>");
        assert_eq!(err.body.as_ref(), b"<html>Bad Gateway</html>\n");
    }

    #[test]
    fn mistyped_json_falls_back_to_message_field() {
        let resp = response(400).with_body(r#"{"err":"Bad input","errors":42}"#);
        let ClientError::Api(err) = check_response(&resp).unwrap_err() else {
            panic!("expected api error");
        };
        assert_eq!(err.message, "Bad input");
        assert!(err.errors.is_empty());
    }

    #[test]
    fn empty_error_body_keeps_status() {
        let err = check_response(&response(500)).unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn classification_is_idempotent() {
        let resp = response(403)
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("X-RateLimit-Reset", "1700000000")
            .with_body(r#"{"err":"Rate limit reached"}"#);
        assert_eq!(check_response(&resp), check_response(&resp));

        let resp = response(404).with_body(r#"{"err":"Task not found","ECODE":"ITEM_013"}"#);
        assert_eq!(check_response(&resp), check_response(&resp));
    }

    #[test]
    fn envelope_skips_rate_for_cached_responses() {
        let resp = response(200)
            .with_header("X-RateLimit-Limit", "100")
            .with_header("X-RateLimit-Remaining", "98");
        assert_eq!(Response::new(&resp, true).rate.unwrap().remaining, 98);
        assert_eq!(Response::new(&resp, false).rate, None);

        let cached = resp.with_header("X-From-Cache", "1");
        assert_eq!(Response::new(&cached, true).rate, None);
    }
}
