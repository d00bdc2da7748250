// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client-certificate TLS setup.
//!
//! Credential material is PEM, either read from disk or passed inline as
//! base64-encoded PEM text.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tracing::{debug, warn};

use crate::config::{AuthConfig, CredentialSource};
use crate::error::ConfigError;

/// Build the rustls client configuration for `auth`.
///
/// Returns `Ok(None)` when authentication is disabled, in which case the
/// HTTP agent keeps its default TLS settings.
pub fn build_tls_config(auth: &AuthConfig) -> Result<Option<Arc<rustls::ClientConfig>>, ConfigError> {
    let Some((cert_source, key_source)) = auth.credential_pair()? else {
        return Ok(None);
    };

    let cert_pem = read_material("certificate", cert_source)?;
    let key_pem = read_material("key", key_source)?;
    let certs = parse_certs(&cert_pem, &describe(cert_source))?;
    let key = parse_private_key(&key_pem, &describe(key_source))?;
    debug!(
        certificates = certs.len(),
        user_email = auth.user_email.as_deref().unwrap_or(""),
        "loaded client certificate"
    );

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| ConfigError::Tls(e.to_string()))?;

    let builder = if auth.skip_server_verification {
        warn!("server certificate verification is disabled for this client");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
    } else {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots)
    };

    let config = builder
        .with_client_auth_cert(certs, key)
        .map_err(|e| ConfigError::Tls(e.to_string()))?;

    Ok(Some(Arc::new(config)))
}

fn describe(source: &CredentialSource) -> String {
    match source {
        CredentialSource::Path(path) => path.display().to_string(),
        CredentialSource::Inline(_) => "inline content".to_string(),
    }
}

fn read_material(what: &'static str, source: &CredentialSource) -> Result<Vec<u8>, ConfigError> {
    match source {
        CredentialSource::Path(path) => std::fs::read(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        }),
        CredentialSource::Inline(encoded) => {
            // Tolerate line-wrapped base64.
            let compact: String = encoded.split_whitespace().collect();
            STANDARD
                .decode(compact)
                .map_err(|source| ConfigError::InvalidBase64 { what, source })
        }
    }
}

fn parse_certs(pem: &[u8], origin: &str) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let mut reader = pem;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConfigError::FileRead {
            path: origin.to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(ConfigError::NoCertificates(origin.to_string()));
    }
    Ok(certs)
}

fn parse_private_key(pem: &[u8], origin: &str) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let mut reader = pem;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| ConfigError::FileRead {
            path: origin.to_string(),
            source,
        })?
        .ok_or_else(|| ConfigError::NoPrivateKey(origin.to_string()))
}

/// Accepts any server certificate while still checking handshake signatures.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
