// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for spinnaker-http.
//!
//! Every failure of the client falls into one of five classes:
//!
//! | Error | Raised by | Retried |
//! |-------|-----------|---------|
//! | [`ConfigError`] | client construction | never |
//! | [`BuildError`] | request construction | never |
//! | [`TransportError`] | network, TLS, body decoding | never |
//! | [`ServiceError`] | upstream rejection | only status 400 |
//! | [`ClientError::InvalidArgument`] | caller contract violations | never |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while building a [`TransportClient`](crate::TransportClient)
/// or resolving its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is missing.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A setting has an unparseable value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),

    /// Authentication is enabled but no certificate source resolved.
    #[error("authentication enabled but no client certificate configured")]
    MissingCertificate,

    /// A certificate source resolved without its matching key.
    #[error("client certificate configured without a private key")]
    MissingKey,

    /// Certificate and key come from different kinds of source.
    #[error("certificate and key must both be inline content or both be file paths")]
    MismatchedSources,

    /// Inline credential material is not valid base64.
    #[error("{what} content is not valid base64: {source}")]
    InvalidBase64 {
        what: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// A credential file could not be read.
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The certificate material contains no PEM certificate.
    #[error("no certificates found in {0}")]
    NoCertificates(String),

    /// The key material contains no PEM private key.
    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    /// rustls rejected the certificate/key pair or protocol setup.
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// Errors raised while constructing a request.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Base address and path do not form a valid URL.
    #[error("invalid request URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Network-level failures and failures to decode what came back.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, connection, TLS handshake or I/O failure before a response arrived.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// Reading the response body failed midway.
    #[error("failed to read response body: {0}")]
    Read(#[source] std::io::Error),

    /// A non-2xx response whose body is not the service's error envelope.
    #[error("failed to parse error response (HTTP {status}): {source}")]
    InvalidEnvelope {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx body that does not deserialize into the caller's target.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Structured rejection returned by the service.
///
/// Decoded from the upstream error envelope `{"status": .., "message": .., ...}`.
/// Fields the client does not interpret are kept in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("service error {status}: {message}")]
pub struct ServiceError {
    /// Status reported by the envelope (HTTP status when the envelope omits it).
    #[serde(default)]
    pub status: u16,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Short error name, e.g. "Not Found".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Status line of the HTTP response that carried the envelope.
    #[serde(skip)]
    pub http_status: u16,

    /// Any additional upstream fields, preserved verbatim.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ServiceError {
    /// Decode an error envelope from a response body.
    pub(crate) fn from_body(http_status: u16, body: &[u8]) -> std::result::Result<Self, TransportError> {
        let mut error: ServiceError =
            serde_json::from_slice(body).map_err(|source| TransportError::InvalidEnvelope {
                status: http_status,
                body: String::from_utf8_lossy(body).into_owned(),
                source,
            })?;
        if error.status == 0 {
            error.status = http_status;
        }
        error.http_status = http_status;
        Ok(error)
    }
}

/// Errors returned by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The caller broke an API contract (e.g. no decode target).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl ClientError {
    /// Returns `true` if the retry orchestrator resubmits after this error.
    ///
    /// Only a service rejection with status 400 is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service(e) if e.status == 400)
    }

    /// Upstream status, if this is a service rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns the service error if this is one.
    pub fn as_service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decoding() {
        let body = br#"{"status":404,"error":"Not Found","message":"Pipeline not found","path":"/pipelines/app/x"}"#;
        let err = ServiceError::from_body(404, body).unwrap();
        assert_eq!(err.status, 404);
        assert_eq!(err.http_status, 404);
        assert_eq!(err.message, "Pipeline not found");
        assert_eq!(err.error.as_deref(), Some("Not Found"));
        assert_eq!(err.fields["path"], "/pipelines/app/x");
    }

    #[test]
    fn test_envelope_without_status_uses_http_status() {
        let err = ServiceError::from_body(503, br#"{"message":"unavailable"}"#).unwrap();
        assert_eq!(err.status, 503);
        assert_eq!(err.message, "unavailable");
    }

    #[test]
    fn test_envelope_that_is_not_json() {
        let err = ServiceError::from_body(502, b"<html>Bad Gateway</html>").unwrap_err();
        match err {
            TransportError::InvalidEnvelope { status, body, .. } => {
                assert_eq!(status, 502);
                assert!(body.contains("Bad Gateway"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_only_400_is_retryable() {
        let bad_request = ClientError::Service(ServiceError::from_body(400, b"{}").unwrap());
        assert!(bad_request.is_retryable());
        assert_eq!(bad_request.status(), Some(400));

        let server_error = ClientError::Service(ServiceError::from_body(500, b"{}").unwrap());
        assert!(!server_error.is_retryable());

        let network = ClientError::Transport(TransportError::Network {
            url: "https://gate.example.com".to_string(),
            message: "connection refused".to_string(),
        });
        assert!(!network.is_retryable());
        assert_eq!(network.status(), None);

        assert!(!ClientError::InvalidArgument("target").is_retryable());
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::from_body(404, br#"{"message":"not found"}"#).unwrap();
        assert_eq!(err.to_string(), "service error 404: not found");
        let wrapped = ClientError::from(err);
        assert_eq!(wrapped.to_string(), "service error 404: not found");
    }
}
