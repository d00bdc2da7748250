// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fields shared by every stage, and stage notifications.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, Result, json_kind};
use crate::field_map::{FieldMeta, decode_fields, lookup};

/// Wire fields of [`StageCommon`], notifications excluded.
pub const COMMON_FIELDS: &[FieldMeta] = &[
    FieldMeta::new("name", "String"),
    FieldMeta::new("refId", "String"),
    FieldMeta::new("requisiteStageRefIds", "Vec<String>"),
];

const MESSAGE_FIELDS: &[FieldMeta] = &[FieldMeta::new("text", "String")];

/// Wire fields of one [`Notification`].
pub const NOTIFICATION_FIELDS: &[FieldMeta] = &[
    FieldMeta::new("type", "String"),
    FieldMeta::new("address", "String"),
    FieldMeta::new("level", "String"),
    FieldMeta::new("when", "Vec<String>"),
    FieldMeta::nested("message", "Map<Object>", MESSAGE_FIELDS),
];

/// Fields every stage carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StageCommon {
    /// Display name.
    pub name: String,

    /// Identifier of the stage within its pipeline.
    pub ref_id: String,

    /// Stages that must complete before this one starts.
    pub requisite_stage_ref_ids: BTreeSet<String>,

    /// Decoded separately by [`decode_notifications`].
    #[serde(skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
}

impl StageCommon {
    pub fn new(name: impl Into<String>, ref_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ref_id: ref_id.into(),
            ..Default::default()
        }
    }

    pub fn with_requisite(mut self, ref_id: impl Into<String>) -> Self {
        self.requisite_stage_ref_ids.insert(ref_id.into());
        self
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }
}

/// A notification sent when the stage reaches one of the `when` states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Notification {
    /// Channel, e.g. "email", "slack".
    #[serde(rename = "type")]
    pub notification_type: String,

    /// Channel-specific destination.
    pub address: String,

    /// Always "stage" for stage notifications.
    pub level: String,

    /// Trigger conditions, e.g. "stage.starting", "stage.failed".
    pub when: BTreeSet<String>,

    /// Custom message per trigger condition.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub message: BTreeMap<String, NotificationMessage>,
}

/// Custom text of a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NotificationMessage {
    pub text: String,
}

/// Decode the `notifications` entry of a stage document.
///
/// An absent or `null` entry yields an empty list.
pub fn decode_notifications(doc: &Map<String, Value>) -> Result<Vec<Notification>> {
    let Some(raw) = lookup(doc, "notifications") else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(DecodeError::InvalidNotifications(format!(
            "expected an array, got {}",
            json_kind(raw)
        )));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(entry) = item else {
                return Err(DecodeError::InvalidNotifications(format!(
                    "entry {i} must be an object, got {}",
                    json_kind(item)
                )));
            };
            decode_fields::<Notification>("notification", entry, &[NOTIFICATION_FIELDS])
                .map_err(|e| DecodeError::InvalidNotifications(format!("entry {i}: {e}")))
        })
        .collect()
}
