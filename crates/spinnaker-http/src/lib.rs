// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Blocking HTTPS client for the Spinnaker gate API.
//!
//! This crate provides the transport layer used to talk to Spinnaker:
//!
//! - [`TransportClient`]: a configured client (connection pool, optional
//!   client certificate, base address)
//! - [`build_request`]: request construction with JSON bodies
//! - [`ApiResponse`]: drained 2xx responses and decoding into caller types
//! - [`execute_with_retry`]: resubmission of requests rejected with status 400
//!
//! # Example
//!
//! ```ignore
//! use spinnaker_http::{ClientConfig, Method, TransportClient};
//!
//! let client = TransportClient::configure(&ClientConfig::from_env()?)?;
//! let response = client.execute_with_retry(|| {
//!     client.build_request::<()>(Method::Get, "/applications/myapp/pipelineConfigs", None)
//! })?;
//! let pipelines: Vec<serde_json::Value> = response.json()?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod tls;

pub use client::{Transport, TransportClient};
pub use config::{
    AuthConfig, AuthSource, CREDENTIAL_PRECEDENCE, ClientConfig, CredentialKind, CredentialSource,
    Layer, resolve_auth,
};
pub use error::{BuildError, ClientError, ConfigError, Result, ServiceError, TransportError};
pub use request::{ApiRequest, JSON_CONTENT_TYPE, Method, build_request};
pub use response::ApiResponse;
pub use retry::{
    AttemptLog, AttemptOutcome, AttemptRecord, RetryPolicy, execute_with_retry,
    execute_with_retry_logged,
};
