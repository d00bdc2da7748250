// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage that triggers a Jenkins job.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Stage;
use crate::common::{COMMON_FIELDS, StageCommon, decode_notifications};
use crate::error::Result;
use crate::field_map::{FieldMeta, decode_fields};
use crate::registry::StageRegistration;

pub const JENKINS: &str = "jenkins";

pub const FIELDS: &[FieldMeta] = &[
    FieldMeta::new("master", "String"),
    FieldMeta::new("job", "String"),
    FieldMeta::new("propertyFile", "String"),
    FieldMeta::new("parameters", "Map<String>"),
    FieldMeta::new("markUnstableAsSuccessful", "bool"),
    FieldMeta::new("waitForCompletion", "bool"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JenkinsStage {
    #[serde(flatten)]
    pub common: StageCommon,

    /// Name of the Jenkins master configured in Spinnaker.
    pub master: String,
    pub job: String,
    /// Build artifact whose properties are exposed to later stages.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub property_file: String,
    pub parameters: BTreeMap<String, String>,
    pub mark_unstable_as_successful: bool,
    pub wait_for_completion: bool,
}

impl JenkinsStage {
    pub fn new(common: StageCommon, master: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            common,
            master: master.into(),
            job: job.into(),
            wait_for_completion: true,
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

fn decode(doc: &Map<String, Value>) -> Result<Stage> {
    let mut stage: JenkinsStage = decode_fields(JENKINS, doc, &[COMMON_FIELDS, FIELDS])?;
    stage.common.notifications = decode_notifications(doc)?;
    Ok(Stage::Jenkins(stage))
}

fn schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(JenkinsStage)
}

pub static REGISTRATION: StageRegistration = StageRegistration {
    stage_type: JENKINS,
    description: "Runs a Jenkins job",
    decode,
    schema,
};
