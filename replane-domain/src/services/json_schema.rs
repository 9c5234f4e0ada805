// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! JsonSchemaValidator: validates a value against a JSON Schema document,
//! producing a human-readable error list. A `None` schema means "no
//! validation" (§9 decision 3), not "anything goes silently" — callers
//! should never even call `validate` in that case, but `validate` treats
//! it the same way if they do.

use jsonschema::Validator;
use serde_json::Value;

use crate::error::ReplaneError;

/// Compiles `schema` and checks `value` against it. Returns a
/// `BadRequest` carrying every violation, formatted for display, if
/// invalid. Compilation failures (a malformed schema document) are also
/// reported as `BadRequest` since schemas are user-supplied input.
pub fn validate(schema: &Value, value: &Value) -> Result<(), ReplaneError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ReplaneError::bad_request_with_code(format!("invalid schema: {e}"), "invalid_schema"))?;

    let errors: Vec<String> = validator.iter_errors(value).map(|e| format!("{}: {}", e.instance_path, e)).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ReplaneError::bad_request(format!("value does not match schema: {}", errors.join("; "))))
    }
}

/// Validates `value` against `schema` only when `schema` is present;
/// `None` is always a pass (§9 decision 3).
pub fn validate_optional(schema: Option<&Value>, value: &Value) -> Result<(), ReplaneError> {
    match schema {
        Some(schema) => validate(schema, value),
        None => Ok(()),
    }
}

/// Thin wrapper that pre-compiles a schema once for repeated validation,
/// used by the replica's hot read path where the same schema validates
/// many requests.
pub struct CompiledSchema {
    validator: Validator,
}

impl CompiledSchema {
    pub fn compile(schema: &Value) -> Result<Self, ReplaneError> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| ReplaneError::bad_request_with_code(format!("invalid schema: {e}"), "invalid_schema"))?;
        Ok(Self { validator })
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_matching_value() {
        let schema = json!({"type": "object", "required": ["text"], "properties": {"text": {"type": "string"}}});
        assert!(validate(&schema, &json!({"text": "hi"})).is_ok());
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = json!({"type": "object", "required": ["text"], "properties": {"text": {"type": "string"}}});
        let err = validate(&schema, &json!({"text": 42})).unwrap_err();
        assert!(format!("{err}").contains("schema"));
    }

    #[test]
    fn no_schema_always_validates() {
        assert!(validate_optional(None, &json!(anything_goes())).is_ok());
    }

    fn anything_goes() -> Value {
        json!({"whatever": true})
    }
}
