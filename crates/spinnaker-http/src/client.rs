// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Blocking HTTPS client for the Spinnaker API.

use std::io::Read;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::error::{BuildError, ConfigError, Result, ServiceError, TransportError};
use crate::request::{self, ApiRequest, JSON_CONTENT_TYPE, Method};
use crate::response::ApiResponse;
use crate::retry::{self, AttemptLog, RetryPolicy};
use crate::tls;

/// Executes one request against the service, without retries.
///
/// Implemented by [`TransportClient`]; tests and callers can supply their own
/// implementation to drive the retry orchestrator.
pub trait Transport {
    /// Send `request` and return the drained 2xx response.
    ///
    /// Non-2xx responses become [`ClientError::Service`](crate::ClientError::Service)
    /// carrying the decoded error envelope.
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Client bound to one base address.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct TransportClient {
    agent: ureq::Agent,
    base_address: String,
    retry: RetryPolicy,
    user_email: Option<String>,
}

impl TransportClient {
    /// Build a client from `config`.
    ///
    /// When authentication is enabled the client certificate is loaded here,
    /// so credential problems surface before any request is sent.
    pub fn configure(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let mut builder = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout);

        let mut user_email = None;
        if let Some(auth) = &config.auth {
            if let Some(tls_config) = tls::build_tls_config(auth)? {
                builder = builder.tls_config(tls_config);
            }
            user_email = auth.user_email.clone();
        }

        let base_address = config.address.clone();
        info!(
            address = %base_address,
            client_certificate = config.auth.as_ref().is_some_and(|a| a.enabled),
            "spinnaker client configured"
        );

        Ok(Self {
            agent: builder.build(),
            base_address,
            retry: config.retry,
            user_email,
        })
    }

    /// Base address requests are built against.
    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    /// Email associated with the client certificate, if configured.
    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    /// Retry policy used by [`execute_with_retry`](Self::execute_with_retry).
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Build a request for `path` relative to the base address.
    pub fn build_request<T>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&T>,
    ) -> std::result::Result<ApiRequest, BuildError>
    where
        T: Serialize + ?Sized,
    {
        request::build_request(&self.base_address, method, path, payload)
    }

    /// Execute `request` once and deserialize the 2xx body.
    pub fn execute_and_decode<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        self.execute(request)?.json()
    }

    /// Execute requests produced by `factory`, resubmitting on status 400.
    pub fn execute_with_retry<F>(&self, factory: F) -> Result<ApiResponse>
    where
        F: FnMut() -> std::result::Result<ApiRequest, BuildError>,
    {
        retry::execute_with_retry(self, &self.retry, factory)
    }

    /// Same as [`execute_with_retry`](Self::execute_with_retry), recording attempts in `log`.
    pub fn execute_with_retry_logged<F>(&self, factory: F, log: &mut AttemptLog) -> Result<ApiResponse>
    where
        F: FnMut() -> std::result::Result<ApiRequest, BuildError>,
    {
        retry::execute_with_retry_logged(self, &self.retry, factory, log)
    }
}

impl Transport for TransportClient {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let call = self
            .agent
            .request_url(request.method.as_str(), &request.url)
            .set("Content-Type", JSON_CONTENT_TYPE);

        let outcome = match &request.body {
            Some(body) => call.send_bytes(body),
            None => call.call(),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(TransportError::Network {
                    url: request.url.to_string(),
                    message: err.to_string(),
                }
                .into());
            }
        };

        let status = response.status();
        let body = drain(response)?;
        debug!(status, bytes = body.len(), "response received");

        if (200..300).contains(&status) {
            Ok(ApiResponse { status, body })
        } else {
            Err(ServiceError::from_body(status, &body)?.into())
        }
    }
}

fn drain(response: ureq::Response) -> std::result::Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(TransportError::Read)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    #[test]
    fn test_configure_without_auth() {
        let client = TransportClient::configure(&ClientConfig::new("https://gate.example.com")).unwrap();
        assert_eq!(client.base_address(), "https://gate.example.com");
        assert_eq!(client.user_email(), None);
        assert_eq!(client.retry_policy().max_attempts, 5);
    }

    #[test]
    fn test_configure_with_disabled_auth_ignores_credentials() {
        let auth = AuthConfig {
            enabled: false,
            ..AuthConfig::from_paths("/does/not/exist.crt", "/does/not/exist.key")
        };
        let config = ClientConfig::new("https://gate.example.com").with_auth(auth);
        assert!(TransportClient::configure(&config).is_ok());
    }

    #[test]
    fn test_configure_with_missing_files_fails() {
        let config = ClientConfig::new("https://gate.example.com")
            .with_auth(AuthConfig::from_paths("/does/not/exist.crt", "/does/not/exist.key"));
        let err = TransportClient::configure(&config).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_client_build_request_uses_base_address() {
        let client = TransportClient::configure(&ClientConfig::new("https://gate.example.com")).unwrap();
        let req = client
            .build_request::<()>(Method::Get, "/applications", None)
            .unwrap();
        assert_eq!(req.url.as_str(), "https://gate.example.com/applications");
    }

    #[test]
    fn test_client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransportClient>();
    }
}
