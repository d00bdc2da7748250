// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage that pauses the pipeline for a fixed time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Stage;
use crate::common::{COMMON_FIELDS, StageCommon, decode_notifications};
use crate::error::Result;
use crate::field_map::{FieldMeta, decode_fields};
use crate::registry::StageRegistration;

pub const WAIT: &str = "wait";

pub const FIELDS: &[FieldMeta] = &[
    FieldMeta::new("waitTime", "u64"),
    FieldMeta::new("skipWaitText", "String"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WaitStage {
    #[serde(flatten)]
    pub common: StageCommon,

    /// Seconds to wait.
    pub wait_time: u64,
    /// Text shown next to the "skip wait" button.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_wait_text: Option<String>,
}

impl WaitStage {
    pub fn new(common: StageCommon, wait_time: u64) -> Self {
        Self {
            common,
            wait_time,
            skip_wait_text: None,
        }
    }
}

fn decode(doc: &Map<String, Value>) -> Result<Stage> {
    let mut stage: WaitStage = decode_fields(WAIT, doc, &[COMMON_FIELDS, FIELDS])?;
    stage.common.notifications = decode_notifications(doc)?;
    Ok(Stage::Wait(stage))
}

fn schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(WaitStage)
}

pub static REGISTRATION: StageRegistration = StageRegistration {
    stage_type: WAIT,
    description: "Waits a fixed number of seconds",
    decode,
    schema,
};
