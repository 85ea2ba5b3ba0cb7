// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A JSON-Schema subset validator.
//!
//! Supports the keywords worth checking on a task's structured payload:
//! `type`, `required`, `properties`, `enum`, `minimum`/`maximum`, `items`,
//! and `pattern`. Anything outside that subset in a schema document is
//! ignored rather than rejected, so teams can carry forward richer schemas
//! without the validator treating them as invalid.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("{path}: expected type {expected}, got {actual}")]
    WrongType {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("{path}: missing required property {property}")]
    MissingRequired { path: String, property: String },
    #[error("{path}: value is not one of the allowed enum variants")]
    NotInEnum { path: String },
    #[error("{path}: {value} is below minimum {minimum}")]
    BelowMinimum { path: String, value: f64, minimum: f64 },
    #[error("{path}: {value} is above maximum {maximum}")]
    AboveMaximum { path: String, value: f64, maximum: f64 },
    #[error("{path}: value does not match pattern {pattern}")]
    PatternMismatch { path: String, pattern: String },
    #[error("{path}: invalid regular expression in schema pattern {pattern}")]
    InvalidPattern { path: String, pattern: String },
}

/// Validates `value` against `schema`, returning the first violation found.
pub fn validate_against_schema(value: &Value, schema: &Value) -> Result<(), SchemaError> {
    validate_at("$", value, schema)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        other => json_type_name(value) == other,
    }
}

fn validate_at(path: &str, value: &Value, schema: &Value) -> Result<(), SchemaError> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(Value::String(expected)) = schema.get("type") {
        if !type_matches(value, expected) {
            return Err(SchemaError::WrongType {
                path: path.to_string(),
                expected: expected.clone(),
                actual: json_type_name(value).to_string(),
            });
        }
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            return Err(SchemaError::NotInEnum {
                path: path.to_string(),
            });
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if n < min {
                return Err(SchemaError::BelowMinimum {
                    path: path.to_string(),
                    value: n,
                    minimum: min,
                });
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if n > max {
                return Err(SchemaError::AboveMaximum {
                    path: path.to_string(),
                    value: n,
                    maximum: max,
                });
            }
        }
    }

    if let Some(Value::String(pattern)) = schema.get("pattern") {
        if let Value::String(s) = value {
            let re = Regex::new(pattern).map_err(|_| SchemaError::InvalidPattern {
                path: path.to_string(),
                pattern: pattern.clone(),
            })?;
            if !re.is_match(s) {
                return Err(SchemaError::PatternMismatch {
                    path: path.to_string(),
                    pattern: pattern.clone(),
                });
            }
        }
    }

    if let Some(Value::Array(required)) = schema.get("required") {
        if let Some(obj) = value.as_object() {
            for req in required {
                if let Value::String(name) = req {
                    if !obj.contains_key(name) {
                        return Err(SchemaError::MissingRequired {
                            path: path.to_string(),
                            property: name.clone(),
                        });
                    }
                }
            }
        }
    }

    if let Some(Value::Object(properties)) = schema.get("properties") {
        if let Some(obj) = value.as_object() {
            for (name, sub_schema) in properties {
                if let Some(sub_value) = obj.get(name) {
                    validate_at(&format!("{path}.{name}"), sub_value, sub_schema)?;
                }
            }
        }
    }

    if let Some(items_schema) = schema.get("items") {
        if let Some(arr) = value.as_array() {
            for (i, item) in arr.iter().enumerate() {
                validate_at(&format!("{path}[{i}]"), item, items_schema)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
