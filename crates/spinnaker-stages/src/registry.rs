// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage type registration.
//!
//! Every variant module exports a static [`StageRegistration`] binding its
//! discriminator to its decode function and schema generator. Dispatch is a
//! lookup in [`REGISTRY`]; supporting a new stage type means adding its module,
//! its [`Stage`] variant and one entry below.

use serde_json::{Map, Value};

use crate::Stage;
use crate::error::Result;
use crate::stages::{jenkins, manual_judgment, target_server_group, wait};

/// Decodes a stage document whose discriminator has already been matched.
pub type StageDecodeFn = fn(&Map<String, Value>) -> Result<Stage>;

/// Generates the JSON Schema of a stage payload.
pub type SchemaGeneratorFn = fn() -> schemars::schema::RootSchema;

/// Metadata and decode entry point for one stage type.
pub struct StageRegistration {
    /// Discriminator value, e.g. "destroyServerGroup".
    pub stage_type: &'static str,
    /// One-line summary for listings.
    pub description: &'static str,
    pub decode: StageDecodeFn,
    pub schema: SchemaGeneratorFn,
}

static REGISTRY: &[&StageRegistration] = &[
    &target_server_group::DESTROY_REGISTRATION,
    &target_server_group::DISABLE_REGISTRATION,
    &manual_judgment::REGISTRATION,
    &jenkins::REGISTRATION,
    &wait::REGISTRATION,
];

/// All registered stage types.
pub fn registered_stage_types() -> impl Iterator<Item = &'static StageRegistration> {
    REGISTRY.iter().copied()
}

/// Find the registration for a discriminator (exact match).
pub fn find_stage_registration(stage_type: &str) -> Option<&'static StageRegistration> {
    registered_stage_types().find(|r| r.stage_type == stage_type)
}

/// JSON Schema of the payload for `stage_type`.
pub fn stage_schema(stage_type: &str) -> Option<schemars::schema::RootSchema> {
    find_stage_registration(stage_type).map(|r| (r.schema)())
}
