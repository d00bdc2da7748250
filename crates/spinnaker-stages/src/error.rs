// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for stage decoding.

use thiserror::Error;

/// Result type using DecodeError.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors raised while decoding a stage document.
///
/// Decoding is all-or-nothing: whenever one of these is returned, no stage
/// value was produced.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is not a JSON object.
    #[error("{what} must be a JSON object, got {found}")]
    NotAnObject {
        what: &'static str,
        found: &'static str,
    },

    /// The `type` field is absent or not a string.
    #[error("stage has no string \"type\" field")]
    MissingDiscriminator,

    /// No variant is registered for the discriminator.
    #[error("unsupported stage type: {0}")]
    UnsupportedStageType(String),

    /// A field value cannot be coerced to the declared type.
    #[error("{stage_type}: field {field} expects {expected}, got {found}")]
    InvalidField {
        stage_type: String,
        field: String,
        expected: &'static str,
        found: String,
    },

    /// The mapped fields do not fit the variant's shape.
    #[error("{stage_type}: {source}")]
    Shape {
        stage_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// The notifications list is malformed.
    #[error("invalid notifications: {0}")]
    InvalidNotifications(String),

    /// A pipeline document without a `stages` array.
    #[error("pipeline has no \"stages\" array")]
    MissingStages,
}

/// Short JSON type name of `value`, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
