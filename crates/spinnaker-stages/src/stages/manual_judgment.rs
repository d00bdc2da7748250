// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage that pauses the pipeline until a person approves it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Stage;
use crate::common::{COMMON_FIELDS, StageCommon, decode_notifications};
use crate::error::Result;
use crate::field_map::{FieldMeta, decode_fields};
use crate::registry::StageRegistration;

pub const MANUAL_JUDGMENT: &str = "manualJudgment";

pub const FIELDS: &[FieldMeta] = &[
    FieldMeta::new("instructions", "String"),
    FieldMeta::nested("judgmentInputs", "Vec<Object>", JUDGMENT_INPUT_FIELDS),
    FieldMeta::new("failPipeline", "bool"),
    FieldMeta::new("propagateAuthenticationContext", "bool"),
    FieldMeta::new("stageTimeoutMs", "u64"),
];

pub const JUDGMENT_INPUT_FIELDS: &[FieldMeta] = &[FieldMeta::new("value", "String")];

/// One option offered to the approver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct JudgmentInput {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ManualJudgmentStage {
    #[serde(flatten)]
    pub common: StageCommon,

    /// Text shown to the approver.
    pub instructions: String,
    pub judgment_inputs: Vec<JudgmentInput>,
    /// Fail the whole pipeline when the judgment is "stop".
    pub fail_pipeline: bool,
    pub propagate_authentication_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_timeout_ms: Option<u64>,
}

impl ManualJudgmentStage {
    pub fn new(common: StageCommon, instructions: impl Into<String>) -> Self {
        Self {
            common,
            instructions: instructions.into(),
            fail_pipeline: true,
            ..Default::default()
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.judgment_inputs = inputs
            .into_iter()
            .map(|value| JudgmentInput { value: value.into() })
            .collect();
        self
    }
}

fn decode(doc: &Map<String, Value>) -> Result<Stage> {
    let mut stage: ManualJudgmentStage = decode_fields(MANUAL_JUDGMENT, doc, &[COMMON_FIELDS, FIELDS])?;
    stage.common.notifications = decode_notifications(doc)?;
    Ok(Stage::ManualJudgment(stage))
}

fn schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(ManualJudgmentStage)
}

pub static REGISTRATION: StageRegistration = StageRegistration {
    stage_type: MANUAL_JUDGMENT,
    description: "Waits for a manual approval before continuing",
    decode,
    schema,
};
