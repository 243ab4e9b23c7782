//! Credential injection as a transport decorator.
//!
//! # Design
//! [`AuthTransport`] wraps another transport. For every request it makes a
//! copy, lets the [`Credential`] decorate the copy's headers, and forwards the
//! copy. Only the header map is deep-copied; the body is reference counted.
//! The caller's request is never touched, so it can be logged or resent as is.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::client::{Client, ClientBuilder};
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport, TransportError, TransportErrorKind};

/// Anything that can authenticate a request.
pub trait Credential: Send + Sync {
    /// The secret this credential carries.
    fn secret(&self) -> &str;

    /// Add the authentication headers. The default sends the secret verbatim
    /// in `Authorization`.
    fn decorate(&self, headers: &mut HeaderMap) -> Result<(), String> {
        insert_authorization(headers, self.secret())
    }
}

/// A personal API token (`pk_...`), sent without a scheme prefix.
#[derive(Clone)]
pub struct PersonalToken(String);

impl PersonalToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Credential for PersonalToken {
    fn secret(&self) -> &str {
        &self.0
    }
}

/// An OAuth access token, sent as `Bearer <token>`.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Credential for BearerToken {
    fn secret(&self) -> &str {
        &self.0
    }

    fn decorate(&self, headers: &mut HeaderMap) -> Result<(), String> {
        insert_authorization(headers, &format!("Bearer {}", self.0))
    }
}

// Tokens must not show up in Debug output of requests or credentials.
impl std::fmt::Debug for PersonalToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PersonalToken(..)")
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

fn insert_authorization(headers: &mut HeaderMap, value: &str) -> Result<(), String> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| "credential is not a valid header value".to_string())?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

/// Transport that authenticates every request before delegating to `inner`.
pub struct AuthTransport<C> {
    credential: C,
    inner: Arc<dyn Transport>,
}

impl<C: Credential> AuthTransport<C> {
    /// Authenticate on top of a default [`ReqwestTransport`].
    pub fn new(credential: C) -> Self {
        Self::with_transport(credential, Arc::new(ReqwestTransport::default()))
    }

    pub fn with_transport(credential: C, inner: Arc<dyn Transport>) -> Self {
        Self { credential, inner }
    }

    pub fn credential(&self) -> &C {
        &self.credential
    }

    /// Copy of `request` carrying the credential headers.
    pub fn authorize(&self, request: &HttpRequest) -> Result<HttpRequest, TransportError> {
        let mut authorized = request.clone();
        self.credential
            .decorate(&mut authorized.headers)
            .map_err(|msg| TransportError::new(request, TransportErrorKind::Request, msg))?;
        Ok(authorized)
    }
}

impl<C: Credential + 'static> AuthTransport<C> {
    /// A client with default settings that sends through this transport.
    pub fn into_client(self) -> Result<Client, ClientError> {
        ClientBuilder::new().transport(self).build()
    }
}

#[async_trait]
impl<C: Credential> Transport for AuthTransport<C> {
    async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let authorized = self.authorize(request)?;
        self.inner.round_trip(&authorized).await
    }
}
