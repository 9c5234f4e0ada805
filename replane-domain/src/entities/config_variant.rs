// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! ConfigVariant: an environment-specific override of a config's value.
//!
//! Exactly one variant exists per `(config_id, environment_id)` pair once
//! created; a config with no variant for a given environment serves its
//! default value instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ConfigId, ConfigVariantId, EnvironmentId};
use crate::value_objects::override_rule::Override;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigVariant {
    pub id: ConfigVariantId,
    pub config_id: ConfigId,
    pub environment_id: EnvironmentId,
    pub value: Value,
    /// When `None`, schema validation is skipped entirely, regardless of
    /// `use_base_schema` (§9 decision 3) — it does not fall back to the
    /// config's own schema.
    pub schema: Option<Value>,
    /// When `true` and `schema` is `Some`, the variant's value must
    /// validate against *both* the config's base schema and this one.
    pub use_base_schema: bool,
    pub overrides: Vec<Override>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigVariant {
    pub fn new(
        config_id: ConfigId,
        environment_id: EnvironmentId,
        value: Value,
        schema: Option<Value>,
        use_base_schema: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConfigVariantId::new(),
            config_id,
            environment_id,
            value,
            schema,
            use_base_schema,
            overrides: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(
        &mut self,
        value: Value,
        schema: Option<Value>,
        use_base_schema: bool,
        overrides: Vec<Override>,
        now: DateTime<Utc>,
    ) {
        self.value = value;
        self.schema = schema;
        self.use_base_schema = use_base_schema;
        self.overrides = overrides;
        self.version += 1;
        self.updated_at = now;
    }

    /// `true` if validation against the config's base schema should be
    /// attempted in addition to (or instead of) this variant's own schema.
    pub fn validates_against_base_schema(&self) -> bool {
        self.schema.is_none() || self.use_base_schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_schema_always_validates_against_base() {
        let v = ConfigVariant::new(ConfigId::new(), EnvironmentId::new(), serde_json::json!(1), None, false, Utc::now());
        assert!(v.validates_against_base_schema());
    }

    #[test]
    fn own_schema_without_use_base_schema_skips_base() {
        let v = ConfigVariant::new(
            ConfigId::new(),
            EnvironmentId::new(),
            serde_json::json!(1),
            Some(serde_json::json!({"type": "number"})),
            false,
            Utc::now(),
        );
        assert!(!v.validates_against_base_schema());
    }
}
