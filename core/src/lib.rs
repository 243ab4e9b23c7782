//! Async client core for the ClickUp v2 REST API.
//!
//! # Overview
//! Builds requests against a configurable base URL, sends them through a
//! pluggable [`Transport`], classifies the response (202 job accepted,
//! rate-limit 403, generic API error) and decodes successful bodies into a
//! caller-chosen [`Destination`]. [`AuthTransport`] injects credentials
//! without mutating the caller's request, and [`FanOut`] fetches a range of
//! pages with bounded concurrency.
//!
//! # Design
//! - Requests and responses are plain data ([`HttpRequest`], [`HttpResponse`]).
//!   Transports only move bytes; everything else is deterministic and testable
//!   with an in-memory transport.
//! - Response bodies are read in full before classification, so the
//!   connection is released on every path and errors can keep the body.
//! - Every call takes a [`Context`] for cancellation and deadlines.
//! - Resource services (`client.tasks()`, `client.spaces()`, ...) are thin
//!   wrappers that format a path and call [`Client::fetch`].
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod context;
pub mod error;
pub mod fan_out;
pub mod http;
pub mod response;
pub mod services;
pub mod transport;
pub mod types;

pub use auth::{AuthTransport, BearerToken, Credential, PersonalToken};
pub use client::{
    Client, ClientBuilder, Destination, ExecuteOptions, JsonTarget, DEFAULT_BASE_URL,
    DEFAULT_USER_AGENT, NO_BODY,
};
pub use context::{CancelReason, Context};
pub use error::{
    format_rate_reset, sanitize_url, AcceptedError, ClientError, ConfigError, ErrorBlock,
    ErrorKind, ErrorResponse, FieldError, RateLimitError, REDACTED,
};
pub use fan_out::{FanOut, PageFailure, PageScan};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use response::{check_response, Rate, Response};
pub use services::{
    FoldersService, GoalsService, GroupsService, ListsService, Query, SpacesService,
    TasksService, ViewsService, WorkspacesService,
};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportErrorKind};
pub use types::{CreateTask, Task, UpdateTask};
