// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Successful responses and decoding of their bodies.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, Result, TransportError};

/// A 2xx response whose body has been read to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Body as text (lossy).
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body into `target`.
    ///
    /// A missing target is a contract violation and fails with
    /// [`ClientError::InvalidArgument`] whatever the body holds.
    pub fn decode_into<T: DeserializeOwned>(&self, target: Option<&mut T>) -> Result<()> {
        let target = target.ok_or(ClientError::InvalidArgument(
            "no target provided to decode the response into",
        ))?;
        *target = self.json()?;
        Ok(())
    }

    /// Deserialize the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        debug!(status = self.status, body = %self.text(), "decoding response body");
        serde_json::from_slice(&self.body)
            .map_err(|e| ClientError::Transport(TransportError::Decode(e)))
    }
}
