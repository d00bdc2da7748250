// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Name-based mapping of untyped documents onto typed stage payloads.
//!
//! Each payload declares the wire fields it understands as a list of
//! [`FieldMeta`]. Mapping a document:
//!
//! 1. looks every declared field up by name, preferring an exact key match and
//!    falling back to a case-insensitive one;
//! 2. treats JSON `null` like an absent key;
//! 3. coerces the value to the declared type;
//! 4. hands the resulting object to serde.
//!
//! Keys that no field declares are ignored. Fields declared with
//! [`FieldMeta::nested`] apply the same rules to the keys of their object
//! values, at any depth.
//!
//! # Supported Coercions
//!
//! | Declared | Accepts | Example |
//! |----------|---------|---------|
//! | `String` | string, number, bool | `42` → `"42"` |
//! | `bool` | bool, number, `"true"`/`"false"`/`"1"`/`"0"`/`"yes"`/`"no"` | `"yes"` → `true` |
//! | `u64` / `i64` | integer, numeric string | `"300"` → `300` |
//! | `f64` | number, numeric string | `"1.5"` → `1.5` |
//! | `Vec<T>` | array, each element coerced to `T` | |
//! | `Map<T>` | object, each value coerced to `T` | |
//! | `Object` | object, mapped by its nested fields if any | |
//! | `Value` | anything | |
//!
//! Anything else (`"abc"` for a `u64`, a string for a `Vec<String>`) is a
//! [`DecodeError::InvalidField`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::{DecodeError, Result, json_kind};

/// A wire field understood by a stage payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Canonical (camelCase) wire name.
    pub name: &'static str,
    /// Declared type, see the module docs.
    pub type_name: &'static str,
    /// Fields of the objects held by this field; empty for opaque values.
    pub fields: &'static [FieldMeta],
}

impl FieldMeta {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            type_name,
            fields: &[],
        }
    }

    /// A field whose `Object` values (bare, in a `Vec` or in a `Map`) are
    /// mapped through `fields`.
    pub const fn nested(name: &'static str, type_name: &'static str, fields: &'static [FieldMeta]) -> Self {
        Self {
            name,
            type_name,
            fields,
        }
    }
}

/// Look `name` up in `doc`: exact key first, then case-insensitive.
///
/// Returns `None` for absent keys and for `null` values.
pub fn lookup<'a>(doc: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let value = doc.get(name).or_else(|| {
        doc.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })?;
    (!value.is_null()).then_some(value)
}

/// Map the declared fields of `doc` into a new object keyed by canonical name.
pub fn map_fields(
    stage_type: &str,
    doc: &Map<String, Value>,
    groups: &[&[FieldMeta]],
) -> Result<Map<String, Value>> {
    map_object("", doc, groups.iter().flat_map(|group| group.iter()))
        .map_err(|mismatch| mismatch.into_error(stage_type))
}

/// Map the declared fields of `doc` and deserialize them into `T`.
pub fn decode_fields<T: DeserializeOwned>(
    stage_type: &str,
    doc: &Map<String, Value>,
    groups: &[&[FieldMeta]],
) -> Result<T> {
    let mapped = map_fields(stage_type, doc, groups)?;
    serde_json::from_value(Value::Object(mapped)).map_err(|source| DecodeError::Shape {
        stage_type: stage_type.to_string(),
        source,
    })
}

struct Mismatch {
    path: String,
    expected: &'static str,
    found: String,
}

impl Mismatch {
    fn new(path: &str, expected: &'static str, value: &Value) -> Self {
        let found = match value {
            Value::Array(_) | Value::Object(_) => json_kind(value).to_string(),
            scalar => format!("{} {}", json_kind(scalar), scalar),
        };
        Self {
            path: path.to_string(),
            expected,
            found,
        }
    }

    fn into_error(self, stage_type: &str) -> DecodeError {
        DecodeError::InvalidField {
            stage_type: stage_type.to_string(),
            field: self.path,
            expected: self.expected,
            found: self.found,
        }
    }
}

fn map_object<'f>(
    prefix: &str,
    doc: &Map<String, Value>,
    fields: impl IntoIterator<Item = &'f FieldMeta>,
) -> std::result::Result<Map<String, Value>, Mismatch> {
    let mut mapped = Map::new();
    for field in fields {
        let Some(value) = lookup(doc, field.name) else {
            continue;
        };
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        let coerced = coerce_field(&path, value, field.type_name, field.fields)?;
        mapped.insert(field.name.to_string(), coerced);
    }
    Ok(mapped)
}

fn coerce_field(
    path: &str,
    value: &Value,
    type_name: &'static str,
    fields: &'static [FieldMeta],
) -> std::result::Result<Value, Mismatch> {
    if let Some(inner) = extract_inner_type(type_name, "Vec") {
        let Value::Array(items) = value else {
            return Err(Mismatch::new(path, type_name, value));
        };
        return items
            .iter()
            .enumerate()
            .map(|(i, item)| coerce_field(&format!("{path}[{i}]"), item, inner, fields))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    if let Some(inner) = extract_inner_type(type_name, "Map") {
        let Value::Object(entries) = value else {
            return Err(Mismatch::new(path, type_name, value));
        };
        let mut out = Map::new();
        for (key, item) in entries {
            if item.is_null() {
                continue;
            }
            out.insert(key.clone(), coerce_field(&format!("{path}.{key}"), item, inner, fields)?);
        }
        return Ok(Value::Object(out));
    }

    if let ("Object", Value::Object(inner)) = (type_name, value) {
        if !fields.is_empty() {
            return map_object(path, inner, fields).map(Value::Object);
        }
    }

    coerce_scalar(value, type_name).ok_or_else(|| Mismatch::new(path, type_name, value))
}

fn coerce_scalar(value: &Value, type_name: &str) -> Option<Value> {
    match (type_name, value) {
        ("Value", v) => Some(v.clone()),
        ("Object", Value::Object(_)) => Some(value.clone()),

        ("String", Value::String(_)) => Some(value.clone()),
        ("String", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("String", Value::Bool(b)) => Some(Value::String(b.to_string())),

        ("bool", Value::Bool(_)) => Some(value.clone()),
        ("bool", Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(Value::Bool(true)),
            "false" | "0" | "no" => Some(Value::Bool(false)),
            _ => None,
        },
        ("bool", Value::Number(n)) => n.as_f64().map(|f| Value::Bool(f != 0.0)),

        ("u64", Value::Number(n)) => n.as_u64().map(Value::from),
        ("u64", Value::String(s)) => s.trim().parse::<u64>().ok().map(Value::from),

        ("i64", Value::Number(n)) => n.as_i64().map(Value::from),
        ("i64", Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

        ("f64", Value::Number(_)) => Some(value.clone()),
        ("f64", Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        _ => None,
    }
}

/// Extract the inner type from a generic type like `Vec<T>` or `Map<T>`.
fn extract_inner_type<'a>(type_name: &'a str, wrapper: &str) -> Option<&'a str> {
    type_name
        .strip_prefix(wrapper)?
        .strip_prefix('<')?
        .strip_suffix('>')
}
