// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stages that act on one server group of a cluster: destroy and disable.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::Stage;
use crate::common::{COMMON_FIELDS, StageCommon, decode_notifications};
use crate::error::Result;
use crate::field_map::{FieldMeta, decode_fields};
use crate::registry::StageRegistration;

pub const DESTROY_SERVER_GROUP: &str = "destroyServerGroup";
pub const DISABLE_SERVER_GROUP: &str = "disableServerGroup";

pub const FIELDS: &[FieldMeta] = &[
    FieldMeta::new("cloudProvider", "String"),
    FieldMeta::new("cloudProviderType", "String"),
    FieldMeta::new("cluster", "String"),
    FieldMeta::new("credentials", "String"),
    FieldMeta::nested("moniker", "Object", MONIKER_FIELDS),
    FieldMeta::new("regions", "Vec<String>"),
    FieldMeta::new("target", "String"),
];

pub const MONIKER_FIELDS: &[FieldMeta] = &[
    FieldMeta::new("app", "String"),
    FieldMeta::new("cluster", "String"),
    FieldMeta::new("detail", "String"),
    FieldMeta::new("stack", "String"),
];

/// Which server group of the cluster the stage acts on.
///
/// The `_dynamic` targets are resolved when the stage runs rather than when
/// the pipeline starts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServerGroupTarget {
    CurrentAsgDynamic,
    AncestorAsgDynamic,
    OldestAsgDynamic,
    LargestAsgDynamic,
    CurrentAsg,
    AncestorAsg,
    OldestAsg,
    LargestAsg,
}

/// Naming components of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Moniker {
    pub app: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stack: String,
}

/// Payload of `destroyServerGroup` and `disableServerGroup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetServerGroupStage {
    #[serde(flatten)]
    pub common: StageCommon,

    /// e.g. "aws", "kubernetes".
    pub cloud_provider: String,
    pub cloud_provider_type: String,
    pub cluster: String,
    /// Account the cluster lives in.
    pub credentials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moniker: Option<Moniker>,
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ServerGroupTarget>,
}

impl TargetServerGroupStage {
    pub fn new(common: StageCommon) -> Self {
        Self {
            common,
            ..Default::default()
        }
    }

    fn decode(stage_type: &str, doc: &Map<String, Value>) -> Result<Self> {
        let mut stage: Self = decode_fields(stage_type, doc, &[COMMON_FIELDS, FIELDS])?;
        stage.common.notifications = decode_notifications(doc)?;
        Ok(stage)
    }
}

fn decode_destroy(doc: &Map<String, Value>) -> Result<Stage> {
    TargetServerGroupStage::decode(DESTROY_SERVER_GROUP, doc).map(Stage::DestroyServerGroup)
}

fn decode_disable(doc: &Map<String, Value>) -> Result<Stage> {
    TargetServerGroupStage::decode(DISABLE_SERVER_GROUP, doc).map(Stage::DisableServerGroup)
}

fn schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(TargetServerGroupStage)
}

pub static DESTROY_REGISTRATION: StageRegistration = StageRegistration {
    stage_type: DESTROY_SERVER_GROUP,
    description: "Destroys one server group of a cluster",
    decode: decode_destroy,
    schema,
};

pub static DISABLE_REGISTRATION: StageRegistration = StageRegistration {
    stage_type: DISABLE_SERVER_GROUP,
    description: "Disables one server group of a cluster, removing it from load balancers",
    decode: decode_disable,
    schema,
};
