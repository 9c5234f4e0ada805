// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Override rules and the condition AST used to evaluate them.
//!
//! An override attaches a replacement `value` to a config or variant,
//! gated by a list of `Condition` trees evaluated against an SDK
//! request-attribute bag; every condition in the list must hold for the
//! override to apply. Conditions may reference another config in the
//! *same project* at a JSON path, resolved one hop at evaluation time
//! (deeper chains are rejected by validation, not silently followed).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ProjectId;

/// Maximum nesting depth of a single `Condition` tree. Guards against
/// pathological input driving unbounded recursion during evaluation.
pub const MAX_CONDITION_DEPTH: usize = 32;

/// A single step into a referenced config's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(u64),
}

/// The right-hand side of a condition: a literal JSON value, or a pointer
/// to another config's value within the same project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueRef {
    Literal { value: Value },
    Reference { project_id: ProjectId, config_name: String, path: Vec<PathSegment> },
}

/// The condition AST gating an override. Closed set per the operator list
/// in §4.5 plus the `and`/`or`/`not` combinators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Equals { property: String, value: ValueRef },
    In { property: String, values: Vec<ValueRef> },
    NotIn { property: String, values: Vec<ValueRef> },
    LessThan { property: String, value: ValueRef },
    LessThanOrEqual { property: String, value: ValueRef },
    GreaterThan { property: String, value: ValueRef },
    GreaterThanOrEqual { property: String, value: ValueRef },
    /// `true` for a deterministic fraction of property values: hashing
    /// `seed ∥ propertyValue` into `[0, 100)` and matching iff the result
    /// falls in `[from_percentage, to_percentage)`.
    Segmentation { property: String, from_percentage: f64, to_percentage: f64, seed: String },
    And { conditions: Vec<Condition> },
    Or { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    /// Depth of the deepest nested node, counting `self` as depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Condition::And { conditions } | Condition::Or { conditions } => {
                1 + conditions.iter().map(Condition::depth).max().unwrap_or(0)
            }
            Condition::Not { condition } => 1 + condition.depth(),
            _ => 1,
        }
    }

    /// All `(project_id, config_name)` references anywhere in this tree.
    pub fn referenced_configs(&self) -> Vec<(ProjectId, String)> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<(ProjectId, String)>) {
        fn push_ref(v: &ValueRef, out: &mut Vec<(ProjectId, String)>) {
            if let ValueRef::Reference { project_id, config_name, .. } = v {
                out.push((*project_id, config_name.clone()));
            }
        }
        match self {
            Condition::Equals { value, .. }
            | Condition::LessThan { value, .. }
            | Condition::LessThanOrEqual { value, .. }
            | Condition::GreaterThan { value, .. }
            | Condition::GreaterThanOrEqual { value, .. } => push_ref(value, out),
            Condition::In { values, .. } | Condition::NotIn { values, .. } => {
                values.iter().for_each(|v| push_ref(v, out))
            }
            Condition::Segmentation { .. } => {}
            Condition::And { conditions } | Condition::Or { conditions } => {
                conditions.iter().for_each(|c| c.collect_references(out))
            }
            Condition::Not { condition } => condition.collect_references(out),
        }
    }
}

/// A named, conditional replacement of a config's value. Every entry in
/// `conditions` must hold for the override to take effect (§9 decision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub value: Value,
}

impl Override {
    /// `true` if this override's reference-bearing conditions all point
    /// back at `containing_project` (§3 invariant: "an override's
    /// referenced projectId equals the containing config's projectId").
    pub fn references_are_well_scoped(&self, containing_project: ProjectId) -> bool {
        self.conditions
            .iter()
            .flat_map(Condition::referenced_configs)
            .all(|(project_id, _)| project_id == containing_project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lit(v: Value) -> ValueRef {
        ValueRef::Literal { value: v }
    }

    #[test]
    fn depth_of_flat_condition_is_one() {
        let c = Condition::Equals { property: "country".into(), value: lit(json!("US")) };
        assert_eq!(c.depth(), 1);
    }

    #[test]
    fn depth_counts_nested_and_or() {
        let inner = Condition::Equals { property: "country".into(), value: lit(json!("US")) };
        let c = Condition::And { conditions: vec![Condition::Or { conditions: vec![inner] }] };
        assert_eq!(c.depth(), 3);
    }

    #[test]
    fn override_with_foreign_project_reference_is_not_well_scoped() {
        let owner = ProjectId::new();
        let other = ProjectId::new();
        let ov = Override {
            name: "beta".into(),
            conditions: vec![Condition::Equals {
                property: "plan".into(),
                value: ValueRef::Reference { project_id: other, config_name: "plan-tiers".into(), path: vec![] },
            }],
            value: json!(true),
        };
        assert!(!ov.references_are_well_scoped(owner));
    }

    #[test]
    fn override_with_matching_project_reference_is_well_scoped() {
        let owner = ProjectId::new();
        let ov = Override {
            name: "beta".into(),
            conditions: vec![Condition::Equals {
                property: "plan".into(),
                value: ValueRef::Reference { project_id: owner, config_name: "plan-tiers".into(), path: vec![] },
            }],
            value: json!(true),
        };
        assert!(ov.references_are_well_scoped(owner));
    }
}
