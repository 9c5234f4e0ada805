// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! OverrideEvaluator: resolves an `Override`'s condition tree against a
//! request-attribute bag and a one-hop `ReferenceResolver`, deciding
//! whether the override's replacement value applies.

use std::collections::HashMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::ids::ProjectId;
use crate::value_objects::override_rule::{Condition, Override, PathSegment, ValueRef, MAX_CONDITION_DEPTH};

/// Resolves a reference's target value. Implemented by the replica layer,
/// which knows how to look up a config by name within a project; the
/// domain only needs the resolved JSON, not how it got it.
pub trait ReferenceResolver {
    /// Returns the referenced config's value, or `None` if the config
    /// does not exist. Callers apply `path` navigation themselves via
    /// `navigate` below once the base value is returned.
    fn resolve(&self, project_id: ProjectId, config_name: &str) -> Option<Value>;
}

/// Request-time attributes the SDK supplies, looked up by condition
/// `property` names (e.g. `"country"`, `"userId"`).
pub type AttributeBag = HashMap<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("condition tree exceeds maximum depth of {0}")]
    TooDeep(usize),
}

/// Returns the first matching override's value, or `None` if no override
/// applies (the caller then falls back to the base/variant value).
pub fn resolve_overrides<R: ReferenceResolver>(
    overrides: &[Override],
    attributes: &AttributeBag,
    resolver: &R,
) -> Result<Option<Value>, EvaluationError> {
    for ov in overrides {
        if ov.conditions.iter().try_fold(true, |acc, c| {
            if c.depth() > MAX_CONDITION_DEPTH {
                return Err(EvaluationError::TooDeep(c.depth()));
            }
            Ok(acc && evaluate(c, attributes, resolver))
        })? {
            return Ok(Some(ov.value.clone()));
        }
    }
    Ok(None)
}

fn evaluate<R: ReferenceResolver>(condition: &Condition, attributes: &AttributeBag, resolver: &R) -> bool {
    match condition {
        Condition::Equals { property, value } => {
            attributes.get(property).zip(resolve_value_ref(value, resolver)).map(|(a, b)| *a == b).unwrap_or(false)
        }
        Condition::In { property, values } => attributes
            .get(property)
            .map(|a| values.iter().filter_map(|v| resolve_value_ref(v, resolver)).any(|b| *a == b))
            .unwrap_or(false),
        Condition::NotIn { property, values } => attributes
            .get(property)
            .map(|a| !values.iter().filter_map(|v| resolve_value_ref(v, resolver)).any(|b| *a == b))
            .unwrap_or(false),
        Condition::LessThan { property, value } => compare(attributes, property, value, resolver, |o| o.is_lt()),
        Condition::LessThanOrEqual { property, value } => compare(attributes, property, value, resolver, |o| o.is_le()),
        Condition::GreaterThan { property, value } => compare(attributes, property, value, resolver, |o| o.is_gt()),
        Condition::GreaterThanOrEqual { property, value } => compare(attributes, property, value, resolver, |o| o.is_ge()),
        Condition::Segmentation { property, from_percentage, to_percentage, seed } => attributes
            .get(property)
            .map(|v| {
                let bucket = segmentation_bucket(seed, v);
                bucket >= *from_percentage && bucket < *to_percentage
            })
            .unwrap_or(false),
        Condition::And { conditions } => conditions.iter().all(|c| evaluate(c, attributes, resolver)),
        Condition::Or { conditions } => conditions.iter().any(|c| evaluate(c, attributes, resolver)),
        Condition::Not { condition } => !evaluate(condition, attributes, resolver),
    }
}

fn compare<R: ReferenceResolver>(
    attributes: &AttributeBag,
    property: &str,
    value: &ValueRef,
    resolver: &R,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    let lhs = attributes.get(property);
    let rhs = resolve_value_ref(value, resolver);
    match (lhs, rhs) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .map(accept)
            .unwrap_or(false),
        (Some(Value::String(a)), Some(Value::String(b))) => accept(a.cmp(&b)),
        _ => false,
    }
}

/// Deterministic bucketing used by `segmentation`: hashes `seed ∥
/// propertyValue` with SHA-256 and maps the first 8 bytes onto `[0, 100)`.
fn segmentation_bucket(seed: &str, property_value: &Value) -> f64 {
    let rendered = match property_value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(rendered.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let n = u64::from_be_bytes(bytes);
    (n as f64 / u64::MAX as f64) * 100.0
}

/// Resolves a `ValueRef` to a concrete JSON value: literals pass through,
/// references are looked up one hop via `resolver` and navigated by
/// `path`. Returns `None` if the referenced config or path segment is
/// missing.
fn resolve_value_ref<R: ReferenceResolver>(value_ref: &ValueRef, resolver: &R) -> Option<Value> {
    match value_ref {
        ValueRef::Literal { value } => Some(value.clone()),
        ValueRef::Reference { project_id, config_name, path } => {
            let base = resolver.resolve(*project_id, config_name)?;
            navigate(&base, path)
        }
    }
}

fn navigate(value: &Value, path: &[PathSegment]) -> Option<Value> {
    let mut current = value;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Key(k), Value::Object(map)) => map.get(k)?,
            (PathSegment::Index(i), Value::Array(arr)) => arr.get(*i as usize)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NullResolver;
    impl ReferenceResolver for NullResolver {
        fn resolve(&self, _project_id: ProjectId, _config_name: &str) -> Option<Value> {
            None
        }
    }

    struct StubResolver(Value);
    impl ReferenceResolver for StubResolver {
        fn resolve(&self, _project_id: ProjectId, _config_name: &str) -> Option<Value> {
            Some(self.0.clone())
        }
    }

    fn attrs(pairs: &[(&str, Value)]) -> AttributeBag {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn equals_literal_matches() {
        let overrides = vec![Override {
            name: "us-only".into(),
            conditions: vec![Condition::Equals { property: "country".into(), value: ValueRef::Literal { value: json!("US") } }],
            value: json!("override-value"),
        }];
        let result = resolve_overrides(&overrides, &attrs(&[("country", json!("US"))]), &NullResolver).unwrap();
        assert_eq!(result, Some(json!("override-value")));
    }

    #[test]
    fn no_match_falls_through_to_none() {
        let overrides = vec![Override {
            name: "us-only".into(),
            conditions: vec![Condition::Equals { property: "country".into(), value: ValueRef::Literal { value: json!("US") } }],
            value: json!("override-value"),
        }];
        let result = resolve_overrides(&overrides, &attrs(&[("country", json!("CA"))]), &NullResolver).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn all_conditions_in_list_must_hold() {
        let overrides = vec![Override {
            name: "us-beta".into(),
            conditions: vec![
                Condition::Equals { property: "country".into(), value: ValueRef::Literal { value: json!("US") } },
                Condition::Equals { property: "beta".into(), value: ValueRef::Literal { value: json!(true) } },
            ],
            value: json!("on"),
        }];
        let result =
            resolve_overrides(&overrides, &attrs(&[("country", json!("US")), ("beta", json!(false))]), &NullResolver).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn reference_is_resolved_and_navigated() {
        let overrides = vec![Override {
            name: "plan-gate".into(),
            conditions: vec![Condition::Equals {
                property: "plan".into(),
                value: ValueRef::Reference {
                    project_id: ProjectId::new(),
                    config_name: "tiers".into(),
                    path: vec![PathSegment::Key("premium".into())],
                },
            }],
            value: json!("premium-feature"),
        }];
        let resolver = StubResolver(json!({"premium": "gold"}));
        let result = resolve_overrides(&overrides, &attrs(&[("plan", json!("gold"))]), &resolver).unwrap();
        assert_eq!(result, Some(json!("premium-feature")));
    }

    #[test]
    fn segmentation_bucket_is_deterministic() {
        let a = segmentation_bucket("seed1", &json!("user-123"));
        let b = segmentation_bucket("seed1", &json!("user-123"));
        assert_eq!(a, b);
        assert!((0.0..100.0).contains(&a));
    }

    #[test]
    fn too_deep_condition_is_rejected() {
        let mut c = Condition::Equals { property: "x".into(), value: ValueRef::Literal { value: json!(1) } };
        for _ in 0..MAX_CONDITION_DEPTH + 1 {
            c = Condition::Not { condition: Box::new(c) };
        }
        let overrides = vec![Override { name: "deep".into(), conditions: vec![c], value: json!(true) }];
        let err = resolve_overrides(&overrides, &AttributeBag::new(), &NullResolver).unwrap_err();
        assert!(matches!(err, EvaluationError::TooDeep(_)));
    }
}
