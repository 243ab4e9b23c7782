//! The pluggable boundary between the client and the network.
//!
//! # Design
//! Anything that turns an [`HttpRequest`] into an [`HttpResponse`] can act as a
//! transport: the default [`ReqwestTransport`], the credential decorator in
//! [`crate::auth`], or an in-memory stub in tests. Requests are borrowed, so a
//! transport that needs to add headers must work on its own copy.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::sanitize_url;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response with its body fully read.
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS, TCP or TLS failure before a response arrived.
    Connect,
    Timeout,
    /// The response body could not be read.
    Body,
    /// The request could not be prepared (e.g. an invalid credential header).
    Request,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Other => "transport",
        };
        f.write_str(s)
    }
}

/// A request that never produced a complete response.
///
/// The URL is sanitized when the error is created, so secrets in the query
/// string never reach logs or callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} {url}: {kind} error: {message}")]
pub struct TransportError {
    pub method: HttpMethod,
    pub url: String,
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(request: &HttpRequest, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            method: request.method,
            url: sanitize_url(&request.url).to_string(),
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(request: &HttpRequest, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_builder() || err.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        // reqwest embeds the unsanitized URL in its message.
        Self::new(request, kind, err.without_url().to_string())
    }
}

/// Transport backed by a shared [`reqwest::Client`] connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(request, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // Draining the body returns the connection to the pool.
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(request, e))?;

        Ok(HttpResponse {
            method: request.method,
            url: request.url.clone(),
            status,
            headers,
            body,
        })
    }
}
