// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request construction against a base address.

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::BuildError;

/// Content type sent with every request.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request, ready to be executed (or re-executed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// Serialized JSON body; `None` when no payload was given.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Content type header value.
    pub fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    /// Body as text, for diagnostics.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        match &self.body {
            Some(body) => String::from_utf8_lossy(body),
            None => std::borrow::Cow::Borrowed(""),
        }
    }
}

/// Build a request for `base + path`, serializing `payload` as the JSON body.
///
/// The path is appended verbatim (no separator is inserted or removed), so
/// callers pass paths starting with `/`.
pub fn build_request<T>(
    base: &str,
    method: Method,
    path: &str,
    payload: Option<&T>,
) -> Result<ApiRequest, BuildError>
where
    T: Serialize + ?Sized,
{
    let raw = format!("{base}{path}");
    let url = Url::parse(&raw).map_err(|source| BuildError::InvalidUrl { url: raw, source })?;

    let body = payload.map(|p| serde_json::to_vec(p)).transpose()?;

    let request = ApiRequest { method, url, body };
    debug!(
        method = %request.method,
        url = %request.url,
        body = %request.body_text(),
        "sending request"
    );
    Ok(request)
}
