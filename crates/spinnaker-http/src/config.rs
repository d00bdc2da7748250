// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client configuration and credential layering.
//!
//! Credentials can arrive from two layers: the explicit configuration handed
//! to the client, and overrides (normally the `SPINNAKER_*` environment).
//! Each layer may carry inline base64 content and/or file paths. Which pair is
//! used is decided by [`CREDENTIAL_PRECEDENCE`], read top to bottom.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Environment variable names understood by [`ClientConfig::from_env`].
pub mod env {
    pub const ADDRESS: &str = "SPINNAKER_ADDRESS";
    pub const CERT_PATH: &str = "SPINNAKER_CERT";
    pub const KEY_PATH: &str = "SPINNAKER_KEY";
    pub const CERT_CONTENT: &str = "SPINNAKER_CERT_CONTENT";
    pub const KEY_CONTENT: &str = "SPINNAKER_KEY_CONTENT";
    pub const USER_EMAIL: &str = "SPINNAKER_EMAIL";
    pub const SKIP_CERT_VERIFICATION: &str = "SPINNAKER_SKIP_CERT_VERIFICATION";
    pub const CONNECT_TIMEOUT_MS: &str = "SPINNAKER_CONNECT_TIMEOUT_MS";
    pub const REQUEST_TIMEOUT_MS: &str = "SPINNAKER_REQUEST_TIMEOUT_MS";
}

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a certificate or key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// PEM file on disk.
    Path(PathBuf),
    /// Base64-encoded PEM content.
    Inline(String),
}

impl CredentialSource {
    fn kind(&self) -> CredentialKind {
        match self {
            Self::Path(_) => CredentialKind::Path,
            Self::Inline(_) => CredentialKind::Inline,
        }
    }
}

/// Resolved authentication settings for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Present a client certificate.
    pub enabled: bool,
    /// Client certificate (chain).
    pub certificate: Option<CredentialSource>,
    /// Private key matching `certificate`.
    pub key: Option<CredentialSource>,
    /// Identity associated with the certificate. Metadata only.
    pub user_email: Option<String>,
    /// Accept any server certificate.
    ///
    /// SECURITY: defaults to `true`. Set it to `false` for endpoints with
    /// publicly verifiable certificates.
    pub skip_server_verification: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            certificate: None,
            key: None,
            user_email: None,
            skip_server_verification: true,
        }
    }
}

impl AuthConfig {
    /// Authentication with certificate and key read from PEM files.
    pub fn from_paths(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            certificate: Some(CredentialSource::Path(cert.into())),
            key: Some(CredentialSource::Path(key.into())),
            ..Self::default()
        }
    }

    /// Authentication with base64-encoded PEM certificate and key.
    pub fn from_inline(cert_base64: impl Into<String>, key_base64: impl Into<String>) -> Self {
        Self {
            enabled: true,
            certificate: Some(CredentialSource::Inline(cert_base64.into())),
            key: Some(CredentialSource::Inline(key_base64.into())),
            ..Self::default()
        }
    }

    /// Set the associated user email.
    pub fn with_user_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    /// Enable or disable server certificate verification skipping.
    pub fn with_skip_server_verification(mut self, skip: bool) -> Self {
        self.skip_server_verification = skip;
        self
    }

    /// Return the certificate/key pair to load, or `None` when disabled.
    ///
    /// Fails when authentication is enabled without a complete pair, or when
    /// the certificate and key are of different kinds.
    pub fn credential_pair(
        &self,
    ) -> Result<Option<(&CredentialSource, &CredentialSource)>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }
        let cert = self
            .certificate
            .as_ref()
            .ok_or(ConfigError::MissingCertificate)?;
        let key = self.key.as_ref().ok_or(ConfigError::MissingKey)?;
        if cert.kind() != key.kind() {
            return Err(ConfigError::MismatchedSources);
        }
        Ok(Some((cert, key)))
    }
}

/// One raw configuration layer, as supplied by a single source.
///
/// Empty strings count as absent, the way unset environment variables do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSource {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub cert_content: Option<String>,
    pub key_content: Option<String>,
    pub user_email: Option<String>,
    pub skip_server_verification: Option<bool>,
}

impl AuthSource {
    /// Read the credential variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the credential variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let skip_server_verification = match non_empty(lookup(env::SKIP_CERT_VERIFICATION)) {
            Some(raw) => Some(parse_bool(env::SKIP_CERT_VERIFICATION, &raw)?),
            None => None,
        };

        Ok(Self {
            enabled: None,
            cert_path: non_empty(lookup(env::CERT_PATH)),
            key_path: non_empty(lookup(env::KEY_PATH)),
            cert_content: non_empty(lookup(env::CERT_CONTENT)),
            key_content: non_empty(lookup(env::KEY_CONTENT)),
            user_email: non_empty(lookup(env::USER_EMAIL)),
            skip_server_verification,
        })
    }

    fn credentials(&self, kind: CredentialKind) -> Option<(CredentialSource, Option<CredentialSource>)> {
        match kind {
            CredentialKind::Inline => {
                let cert = present(&self.cert_content)?;
                Some((
                    CredentialSource::Inline(cert.to_string()),
                    present(&self.key_content).map(|k| CredentialSource::Inline(k.to_string())),
                ))
            }
            CredentialKind::Path => {
                let cert = present(&self.cert_path)?;
                Some((
                    CredentialSource::Path(PathBuf::from(cert)),
                    present(&self.key_path).map(|k| CredentialSource::Path(PathBuf::from(k))),
                ))
            }
        }
    }

    fn has_credentials(&self) -> bool {
        present(&self.cert_path).is_some() || present(&self.cert_content).is_some()
    }
}

/// Configuration layer a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Environment-style overrides.
    Overrides,
    /// The explicit configuration.
    Explicit,
}

/// Kind of credential material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Inline,
    Path,
}

/// Credential precedence, highest first.
///
/// Overrides beat explicit configuration; within a layer inline content beats
/// file paths. The first entry whose certificate is present supplies both the
/// certificate and the key.
pub const CREDENTIAL_PRECEDENCE: [(Layer, CredentialKind); 4] = [
    (Layer::Overrides, CredentialKind::Inline),
    (Layer::Overrides, CredentialKind::Path),
    (Layer::Explicit, CredentialKind::Inline),
    (Layer::Explicit, CredentialKind::Path),
];

/// Combine an explicit layer and an override layer into one [`AuthConfig`].
///
/// Authentication is enabled if the explicit layer enables it or the
/// overrides supply a certificate.
pub fn resolve_auth(explicit: &AuthSource, overrides: &AuthSource) -> AuthConfig {
    let layer = |l: Layer| match l {
        Layer::Overrides => overrides,
        Layer::Explicit => explicit,
    };

    let (certificate, key) = CREDENTIAL_PRECEDENCE
        .iter()
        .find_map(|&(l, kind)| layer(l).credentials(kind))
        .map(|(cert, key)| (Some(cert), key))
        .unwrap_or((None, None));

    let enabled = explicit.enabled.unwrap_or(false)
        || overrides.enabled.unwrap_or(false)
        || overrides.has_credentials();

    AuthConfig {
        enabled,
        certificate,
        key,
        user_email: non_empty(overrides.user_email.clone())
            .or_else(|| non_empty(explicit.user_email.clone())),
        skip_server_verification: overrides
            .skip_server_verification
            .or(explicit.skip_server_verification)
            .unwrap_or(true),
    }
}

/// Configuration for a [`TransportClient`](crate::TransportClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base address of the API, e.g. `https://gate.example.com`.
    pub address: String,
    /// Client-certificate authentication.
    pub auth: Option<AuthConfig>,
    /// Connection timeout for each attempt.
    pub connect_timeout: Duration,
    /// Read/write timeout for each attempt.
    pub request_timeout: Duration,
    /// Retry policy for [`execute_with_retry`](crate::TransportClient::execute_with_retry).
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Create a configuration for `address` with default settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            auth: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SPINNAKER_ADDRESS`: API base address (required)
    /// - `SPINNAKER_CERT` / `SPINNAKER_KEY`: certificate and key paths
    /// - `SPINNAKER_CERT_CONTENT` / `SPINNAKER_KEY_CONTENT`: base64 certificate and key
    /// - `SPINNAKER_EMAIL`: user email
    /// - `SPINNAKER_SKIP_CERT_VERIFICATION`: skip server verification (default: "true")
    /// - `SPINNAKER_CONNECT_TIMEOUT_MS`: connection timeout (default: 10000)
    /// - `SPINNAKER_REQUEST_TIMEOUT_MS`: request timeout (default: 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = non_empty(lookup(env::ADDRESS)).ok_or(ConfigError::Missing(env::ADDRESS))?;

        let connect_timeout = parse_millis(
            env::CONNECT_TIMEOUT_MS,
            lookup(env::CONNECT_TIMEOUT_MS),
            DEFAULT_CONNECT_TIMEOUT,
        )?;
        let request_timeout = parse_millis(
            env::REQUEST_TIMEOUT_MS,
            lookup(env::REQUEST_TIMEOUT_MS),
            DEFAULT_REQUEST_TIMEOUT,
        )?;

        let overrides = AuthSource::from_lookup(&lookup)?;
        let auth = resolve_auth(&AuthSource::default(), &overrides);

        Ok(Self {
            address,
            auth: auth.enabled.then_some(auth),
            connect_timeout,
            request_timeout,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the authentication settings.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid(name, format!("expected a boolean, got {other:?}"))),
    }
}

fn parse_millis(
    name: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match non_empty(raw) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::Invalid(name, e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn paths(cert: &str, key: &str) -> AuthSource {
        AuthSource {
            cert_path: Some(cert.to_string()),
            key_path: Some(key.to_string()),
            ..Default::default()
        }
    }

    fn inline(cert: &str, key: &str) -> AuthSource {
        AuthSource {
            cert_content: Some(cert.to_string()),
            key_content: Some(key.to_string()),
            ..Default::default()
        }
    }

    fn merge(a: AuthSource, b: AuthSource) -> AuthSource {
        AuthSource {
            cert_path: a.cert_path.or(b.cert_path),
            key_path: a.key_path.or(b.key_path),
            cert_content: a.cert_content.or(b.cert_content),
            key_content: a.key_content.or(b.key_content),
            ..Default::default()
        }
    }

    #[test]
    fn test_precedence_override_inline_beats_everything() {
        let explicit = merge(paths("/e.crt", "/e.key"), inline("RVhQ", "RVhL"));
        let overrides = merge(paths("/o.crt", "/o.key"), inline("T1ZS", "T0tF"));
        let auth = resolve_auth(&explicit, &overrides);
        assert_eq!(auth.certificate, Some(CredentialSource::Inline("T1ZS".into())));
        assert_eq!(auth.key, Some(CredentialSource::Inline("T0tF".into())));
    }

    #[test]
    fn test_precedence_override_path_beats_explicit_inline() {
        let explicit = inline("RVhQ", "RVhL");
        let overrides = paths("/o.crt", "/o.key");
        let auth = resolve_auth(&explicit, &overrides);
        assert_eq!(auth.certificate, Some(CredentialSource::Path("/o.crt".into())));
        assert_eq!(auth.key, Some(CredentialSource::Path("/o.key".into())));
        assert!(auth.enabled);
    }

    #[test]
    fn test_precedence_explicit_inline_beats_explicit_path() {
        let explicit = AuthSource {
            enabled: Some(true),
            ..merge(paths("/e.crt", "/e.key"), inline("RVhQ", "RVhL"))
        };
        let auth = resolve_auth(&explicit, &AuthSource::default());
        assert_eq!(auth.certificate, Some(CredentialSource::Inline("RVhQ".into())));
        assert_eq!(auth.key, Some(CredentialSource::Inline("RVhL".into())));
    }

    #[test]
    fn test_precedence_explicit_path_is_last_resort() {
        let explicit = AuthSource {
            enabled: Some(true),
            ..paths("/e.crt", "/e.key")
        };
        let auth = resolve_auth(&explicit, &AuthSource::default());
        assert_eq!(auth.certificate, Some(CredentialSource::Path("/e.crt".into())));
        assert!(auth.enabled);
    }

    #[test]
    fn test_key_follows_certificate_layer() {
        // Override certificate without key must not borrow the explicit key.
        let explicit = paths("/e.crt", "/e.key");
        let overrides = AuthSource {
            cert_path: Some("/o.crt".into()),
            ..Default::default()
        };
        let auth = resolve_auth(&explicit, &overrides);
        assert_eq!(auth.certificate, Some(CredentialSource::Path("/o.crt".into())));
        assert_eq!(auth.key, None);
        assert!(matches!(auth.credential_pair(), Err(ConfigError::MissingKey)));
    }

    #[test]
    fn test_explicit_credentials_without_enable_stay_disabled() {
        let auth = resolve_auth(&paths("/e.crt", "/e.key"), &AuthSource::default());
        assert!(!auth.enabled);
        assert!(auth.credential_pair().unwrap().is_none());
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let overrides = AuthSource {
            cert_content: Some("   ".into()),
            cert_path: Some("".into()),
            ..Default::default()
        };
        let auth = resolve_auth(&AuthSource::default(), &overrides);
        assert!(!auth.enabled);
        assert_eq!(auth.certificate, None);
    }

    #[test]
    fn test_user_email_and_verification_override() {
        let explicit = AuthSource {
            user_email: Some("explicit@example.com".into()),
            skip_server_verification: Some(false),
            ..Default::default()
        };
        let auth = resolve_auth(&explicit, &AuthSource::default());
        assert_eq!(auth.user_email.as_deref(), Some("explicit@example.com"));
        assert!(!auth.skip_server_verification);

        let overrides = AuthSource {
            user_email: Some("env@example.com".into()),
            skip_server_verification: Some(true),
            ..Default::default()
        };
        let auth = resolve_auth(&explicit, &overrides);
        assert_eq!(auth.user_email.as_deref(), Some("env@example.com"));
        assert!(auth.skip_server_verification);
    }

    #[test]
    fn test_mismatched_sources_rejected() {
        let auth = AuthConfig {
            enabled: true,
            certificate: Some(CredentialSource::Inline("Y2VydA==".into())),
            key: Some(CredentialSource::Path("/k.pem".into())),
            ..Default::default()
        };
        assert!(matches!(auth.credential_pair(), Err(ConfigError::MismatchedSources)));
    }

    #[test]
    fn test_enabled_without_certificate_rejected() {
        let auth = AuthConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(matches!(auth.credential_pair(), Err(ConfigError::MissingCertificate)));
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = ClientConfig::from_lookup(lookup(&[(env::ADDRESS, "https://gate.example.com")]))
            .unwrap();
        assert_eq!(config.address, "https://gate.example.com");
        assert!(config.auth.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_with_credentials() {
        let config = ClientConfig::from_lookup(lookup(&[
            (env::ADDRESS, "https://gate.example.com"),
            (env::CERT_PATH, "/home/me/.spin/client.crt"),
            (env::KEY_PATH, "/home/me/.spin/client.key"),
            (env::USER_EMAIL, "me@example.com"),
            (env::SKIP_CERT_VERIFICATION, "false"),
            (env::REQUEST_TIMEOUT_MS, "5000"),
        ]))
        .unwrap();

        let auth = config.auth.unwrap();
        assert!(auth.enabled);
        assert_eq!(
            auth.certificate,
            Some(CredentialSource::Path("/home/me/.spin/client.crt".into()))
        );
        assert_eq!(auth.user_email.as_deref(), Some("me@example.com"));
        assert!(!auth.skip_server_verification);
        assert_eq!(config.request_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_from_lookup_missing_address() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(env::ADDRESS)));
    }

    #[test]
    fn test_from_lookup_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[
            (env::ADDRESS, "https://gate.example.com"),
            (env::CONNECT_TIMEOUT_MS, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(env::CONNECT_TIMEOUT_MS, _)));

        let err = ClientConfig::from_lookup(lookup(&[
            (env::ADDRESS, "https://gate.example.com"),
            (env::SKIP_CERT_VERIFICATION, "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(env::SKIP_CERT_VERIFICATION, _)));
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::new("https://gate.example.com")
            .with_auth(AuthConfig::from_paths("/c.pem", "/k.pem").with_user_email("a@b.c"))
            .with_connect_timeout(Duration::from_secs(2))
            .with_request_timeout(Duration::from_secs(20))
            .with_retry(RetryPolicy::default().with_max_attempts(2));

        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.retry.max_attempts, 2);
        let auth = config.auth.unwrap();
        assert!(auth.skip_server_verification);
        assert_eq!(auth.user_email.as_deref(), Some("a@b.c"));
    }
}
