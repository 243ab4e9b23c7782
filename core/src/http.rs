//! Plain-data HTTP values exchanged with a [`Transport`](crate::Transport).
//!
//! # Design
//! Requests and responses are described as owned data. The client builds an
//! `HttpRequest`, hands a shared reference to the transport, and receives an
//! `HttpResponse` whose body has already been read to the end. Keeping the
//! body buffered means there is no open stream to leak on any exit path and
//! the classifier can inspect the bytes as many times as it needs.

use std::fmt;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

pub const HEADER_RATE_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_RATE_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RATE_RESET: &str = "x-ratelimit-reset";

/// Set by caching transports on responses served from cache.
pub const HEADER_FROM_CACHE: &str = "x-from-cache";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully-formed request: absolute URL, headers, optional JSON body.
///
/// Built fresh for every call by [`Client::new_request`](crate::Client::new_request).
/// Cloning is cheap apart from the header map; the body is reference counted.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Append form-encoded query parameters, keeping any already present.
    pub fn with_query(mut self, query: &[(&str, &str)]) -> Self {
        if !query.is_empty() {
            self.url.query_pairs_mut().extend_pairs(query);
        }
        self
    }
}

/// A completed response with its body fully read.
///
/// `method` and `url` identify the request this answers, so error values can
/// describe the failing call without holding on to the request itself.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub method: HttpMethod,
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// An empty response to `request` with the given status.
    pub fn for_request(request: &HttpRequest, status: u16) -> Self {
        Self {
            method: request.method,
            url: request.url.clone(),
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header. Names or values that are not valid HTTP are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of `name` as a string, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
