// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed Spinnaker pipeline stages.
//!
//! Pipelines come back from the API as untyped JSON. This crate turns each
//! stage document into one [`Stage`] variant, selected by the document's
//! `type` field:
//!
//! ```
//! use serde_json::json;
//! use spinnaker_stages::{Stage, decode_stage_value};
//! use spinnaker_stages::stages::target_server_group::ServerGroupTarget;
//!
//! let stage = decode_stage_value(&json!({
//!     "type": "destroyServerGroup",
//!     "target": "current_asg",
//!     "notifications": []
//! }))
//! .unwrap();
//!
//! let Stage::DestroyServerGroup(payload) = &stage else { unreachable!() };
//! assert_eq!(payload.target, Some(ServerGroupTarget::CurrentAsg));
//! assert!(payload.common.notifications.is_empty());
//! ```
//!
//! Serializing a [`Stage`] produces the wire document expected by the API.

pub mod common;
pub mod error;
pub mod field_map;
pub mod registry;
pub mod stages;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub use common::{Notification, NotificationMessage, StageCommon};
pub use error::{DecodeError, Result};
pub use registry::{StageRegistration, find_stage_registration, registered_stage_types, stage_schema};
pub use stages::jenkins::JenkinsStage;
pub use stages::manual_judgment::{JudgmentInput, ManualJudgmentStage};
pub use stages::target_server_group::{Moniker, ServerGroupTarget, TargetServerGroupStage};
pub use stages::wait::WaitStage;

use error::json_kind;

/// Discriminator field of a stage document.
pub const DISCRIMINATOR: &str = "type";

/// A pipeline stage, one variant per supported `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Stage {
    #[serde(rename = "destroyServerGroup")]
    DestroyServerGroup(TargetServerGroupStage),

    #[serde(rename = "disableServerGroup")]
    DisableServerGroup(TargetServerGroupStage),

    #[serde(rename = "manualJudgment")]
    ManualJudgment(ManualJudgmentStage),

    #[serde(rename = "jenkins")]
    Jenkins(JenkinsStage),

    #[serde(rename = "wait")]
    Wait(WaitStage),
}

impl Stage {
    /// Discriminator value of this variant.
    pub fn stage_type(&self) -> &'static str {
        use stages::{jenkins, manual_judgment, target_server_group, wait};
        match self {
            Self::DestroyServerGroup(_) => target_server_group::DESTROY_SERVER_GROUP,
            Self::DisableServerGroup(_) => target_server_group::DISABLE_SERVER_GROUP,
            Self::ManualJudgment(_) => manual_judgment::MANUAL_JUDGMENT,
            Self::Jenkins(_) => jenkins::JENKINS,
            Self::Wait(_) => wait::WAIT,
        }
    }

    /// Fields shared by all stages.
    pub fn common(&self) -> &StageCommon {
        match self {
            Self::DestroyServerGroup(s) | Self::DisableServerGroup(s) => &s.common,
            Self::ManualJudgment(s) => &s.common,
            Self::Jenkins(s) => &s.common,
            Self::Wait(s) => &s.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut StageCommon {
        match self {
            Self::DestroyServerGroup(s) | Self::DisableServerGroup(s) => &mut s.common,
            Self::ManualJudgment(s) => &mut s.common,
            Self::Jenkins(s) => &mut s.common,
            Self::Wait(s) => &mut s.common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn ref_id(&self) -> &str {
        &self.common().ref_id
    }
}

/// Decode one stage document.
///
/// The `type` key is found case-insensitively; its value must match a
/// registered stage type exactly.
pub fn decode_stage(doc: &Map<String, Value>) -> Result<Stage> {
    let stage_type = field_map::lookup(doc, DISCRIMINATOR)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingDiscriminator)?;

    let registration = find_stage_registration(stage_type)
        .ok_or_else(|| DecodeError::UnsupportedStageType(stage_type.to_string()))?;

    debug!(stage_type, "decoding stage");
    (registration.decode)(doc)
}

/// Decode one stage from any JSON value.
pub fn decode_stage_value(value: &Value) -> Result<Stage> {
    match value {
        Value::Object(doc) => decode_stage(doc),
        other => Err(DecodeError::NotAnObject {
            what: "stage",
            found: json_kind(other),
        }),
    }
}

/// Decode every stage of a pipeline document.
///
/// Fails on the first stage that does not decode; no stages are returned in
/// that case.
pub fn decode_stages(pipeline: &Value) -> Result<Vec<Stage>> {
    let Value::Object(doc) = pipeline else {
        return Err(DecodeError::NotAnObject {
            what: "pipeline",
            found: json_kind(pipeline),
        });
    };
    let Some(Value::Array(stages)) = field_map::lookup(doc, "stages") else {
        return Err(DecodeError::MissingStages);
    };
    stages.iter().map(decode_stage_value).collect()
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode_stage_value(&value).map_err(serde::de::Error::custom)
    }
}
