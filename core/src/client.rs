//! Request construction and execution for the ClickUp API.
//!
//! # Design
//! `Client` owns one configuration (base URL, user agent, transport) behind a
//! single mutex. Each call snapshots what it needs, so reconfiguring a client
//! never affects a request that is already in flight. Cloning a client is
//! cheap and the clones share that configuration.
//!
//! A call is split in two steps, as with any request/response pair:
//! [`Client::new_request`] produces an [`HttpRequest`], and [`Client::execute`]
//! sends it, classifies the response and decodes the body into a
//! [`Destination`]. Resource services use the [`Client::fetch`] shortcut.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::context::Context;
use crate::error::{sanitize_url, ClientError, ConfigError};
use crate::http::{HttpMethod, HttpRequest};
use crate::response::{check_response, Response};
use crate::transport::{ReqwestTransport, Transport};

pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2/";
pub const DEFAULT_USER_AGENT: &str = concat!("clickup-core/", env!("CARGO_PKG_VERSION"));

/// Typed "no body" for [`Client::new_request`].
pub const NO_BODY: Option<&()> = None;

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

/// Something a JSON body can be decoded into.
pub trait JsonTarget {
    fn decode_json(&mut self, body: &[u8]) -> Result<(), serde_json::Error>;
}

impl<T: DeserializeOwned> JsonTarget for Option<T> {
    fn decode_json(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        *self = Some(serde_json::from_slice(body)?);
        Ok(())
    }
}

/// Where [`Client::execute`] puts a successful response body.
pub enum Destination<'a> {
    /// Ignore the body.
    Discard,
    /// Copy the raw bytes, no JSON interpretation.
    Raw(&'a mut (dyn Write + Send)),
    /// Decode JSON. An empty body leaves the target untouched.
    Json(&'a mut (dyn JsonTarget + Send)),
}

/// Per-call switches for [`Client::execute_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// The call is exempt from quota accounting: no rate snapshot is taken
    /// from its response.
    pub bypass_rate_limit_check: bool,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

struct ClientConfig {
    base_url: Url,
    user_agent: Option<HeaderValue>,
    transport: Arc<dyn Transport>,
}

/// Builder for [`Client`]. Defaults: the public v2 API, the crate user agent,
/// and an unauthenticated [`ReqwestTransport`].
pub struct ClientBuilder {
    base_url: String,
    user_agent: String,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            transport: None,
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL for relative paths. Should end with `/`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// User agent header. An empty string disables the header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client, ClientError> {
        let config = ClientConfig {
            base_url: parse_base_url(&self.base_url)?,
            user_agent: parse_user_agent(&self.user_agent)?,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::default())),
        };
        Ok(Client {
            config: Arc::new(Mutex::new(config)),
        })
    }
}

fn parse_base_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|e| ConfigError::InvalidBaseUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn parse_user_agent(user_agent: &str) -> Result<Option<HeaderValue>, ConfigError> {
    if user_agent.is_empty() {
        return Ok(None);
    }
    HeaderValue::from_str(user_agent)
        .map(Some)
        .map_err(|_| ConfigError::InvalidUserAgent(user_agent.to_string()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the ClickUp v2 REST API.
///
/// Reconfiguring (`set_*`) while requests that depend on the old settings are
/// still running is the caller's responsibility: in-flight calls keep the
/// snapshot they started with.
#[derive(Clone)]
pub struct Client {
    config: Arc<Mutex<ClientConfig>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config();
        f.debug_struct("Client")
            .field("base_url", &config.base_url.as_str())
            .field("user_agent", &config.user_agent)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// A client with default settings sending through `transport`.
    pub fn new(transport: impl Transport + 'static) -> Result<Self, ClientError> {
        ClientBuilder::new().transport(transport).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    fn config(&self) -> MutexGuard<'_, ClientConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn base_url(&self) -> Url {
        self.config().base_url.clone()
    }

    /// Point the client at another API root. The trailing-slash requirement
    /// is checked when requests are built.
    pub fn set_base_url(&self, url: &str) -> Result<(), ClientError> {
        let parsed = parse_base_url(url)?;
        self.config().base_url = parsed;
        Ok(())
    }

    pub fn user_agent(&self) -> Option<String> {
        self.config()
            .user_agent
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn set_user_agent(&self, user_agent: &str) -> Result<(), ClientError> {
        let parsed = parse_user_agent(user_agent)?;
        self.config().user_agent = parsed;
        Ok(())
    }

    /// The transport used for new calls.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.config().transport)
    }

    /// Swap the transport, e.g. to change credentials.
    pub fn set_transport(&self, transport: impl Transport + 'static) {
        self.config().transport = Arc::new(transport);
    }

    /// Build a request for `path`, resolved against the base URL.
    ///
    /// `path` may be relative (`"team/1/space"`) or absolute
    /// (`"https://..."`); resolution follows standard URL rules. A `body` is
    /// encoded as JSON and sent with `Content-Type: application/json`.
    pub fn new_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let (base_url, user_agent) = {
            let config = self.config();
            (config.base_url.clone(), config.user_agent.clone())
        };

        if !base_url.path().ends_with('/') {
            return Err(ConfigError::MissingTrailingSlash(base_url.to_string()).into());
        }

        let url = base_url.join(path).map_err(|e| ClientError::InvalidUrl {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        let body = match body {
            Some(body) => {
                let encoded =
                    serde_json::to_vec(body).map_err(|e| ClientError::Encode(e.to_string()))?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(Bytes::from(encoded))
            }
            None => None,
        };
        if let Some(user_agent) = user_agent {
            headers.insert(USER_AGENT, user_agent);
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send `request` and decode a successful body into `destination`.
    ///
    /// Exactly one network attempt is made. A 202 fails with
    /// [`ClientError::Accepted`], which still carries the [`Response`].
    pub async fn execute(
        &self,
        ctx: &Context,
        request: HttpRequest,
        destination: Destination<'_>,
    ) -> Result<Response, ClientError> {
        self.execute_with(ctx, request, destination, ExecuteOptions::default())
            .await
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(method = %request.method, url = %sanitize_url(&request.url))
    )]
    pub async fn execute_with(
        &self,
        ctx: &Context,
        request: HttpRequest,
        destination: Destination<'_>,
        options: ExecuteOptions,
    ) -> Result<Response, ClientError> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        let transport = self.transport();
        let outcome = tokio::select! {
            biased;
            reason = ctx.done() => return Err(reason.into()),
            outcome = transport.round_trip(&request) => outcome,
        };

        let http = match outcome {
            Ok(http) => http,
            Err(err) => {
                // A cancelled context explains the failure better than the
                // transport does.
                if let Some(reason) = ctx.err() {
                    return Err(reason.into());
                }
                debug!(error = %err, "transport failed");
                return Err(err.into());
            }
        };

        debug!(status = http.status, bytes = http.body.len(), "response received");

        if let Err(mut err) = check_response(&http) {
            debug!(status = http.status, error = %err, "response classified as error");
            if let ClientError::Accepted(accepted) = &mut err {
                accepted.response = Response::new(&http, !options.bypass_rate_limit_check);
            }
            return Err(err);
        }

        let response = Response::new(&http, !options.bypass_rate_limit_check);
        match destination {
            Destination::Discard => {}
            Destination::Raw(sink) => {
                sink.write_all(&http.body).map_err(|e| ClientError::Sink {
                    method: http.method,
                    url: sanitize_url(&http.url).to_string(),
                    status: http.status,
                    message: e.to_string(),
                })?;
            }
            Destination::Json(target) => {
                if !http.body.iter().all(u8::is_ascii_whitespace) {
                    target
                        .decode_json(&http.body)
                        .map_err(|e| ClientError::Decode {
                            method: http.method,
                            url: sanitize_url(&http.url).to_string(),
                            status: http.status,
                            message: e.to_string(),
                        })?;
                }
            }
        }
        Ok(response)
    }

    /// Execute `request` and decode the body as `T`. An empty body yields
    /// `T::default()`.
    pub async fn fetch<T>(
        &self,
        ctx: &Context,
        request: HttpRequest,
    ) -> Result<(T, Response), ClientError>
    where
        T: DeserializeOwned + Default + Send,
    {
        let mut slot: Option<T> = None;
        let response = self
            .execute(ctx, request, Destination::Json(&mut slot))
            .await?;
        Ok((slot.unwrap_or_default(), response))
    }
}
