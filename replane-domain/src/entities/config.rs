// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Config: a named, versioned settings document scoped to a project.
//!
//! Every config carries a "default variant" inline (the value served when
//! no environment-specific `ConfigVariant` exists yet), plus independent
//! per-environment variants (see `entities::config_variant`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReplaneError;
use crate::ids::{ConfigId, ProjectId, UserId};
use crate::value_objects::override_rule::Override;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigRole {
    Editor,
    Maintainer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUser {
    pub email: String,
    pub role: ConfigRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub id: ConfigId,
    pub project_id: ProjectId,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub value: Value,
    pub schema: Option<Value>,
    pub overrides: Vec<Override>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator_id: UserId,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_id: ProjectId,
        key: String,
        name: String,
        description: Option<String>,
        value: Value,
        schema: Option<Value>,
        creator_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConfigId::new(),
            project_id,
            key,
            name,
            description,
            value,
            schema,
            overrides: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            creator_id,
        }
    }

    /// Bumps the version and refreshes `updated_at`. Called on every
    /// successful `updateConfig`, even a no-op edit (§9 decision 1).
    pub fn apply_update(
        &mut self,
        value: Value,
        schema: Option<Value>,
        overrides: Vec<Override>,
        now: DateTime<Utc>,
    ) {
        self.value = value;
        self.schema = schema;
        self.overrides = overrides;
        self.version += 1;
        self.updated_at = now;
    }
}

/// A config key must be a non-empty slug unique within its project; the
/// uniqueness half of that invariant is enforced by a unique index at the
/// store layer, this only covers the shape (§3).
pub fn ensure_valid_key(key: &str) -> Result<(), ReplaneError> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(ReplaneError::bad_request_with_code(
            "config key must be a non-empty string of letters, digits, '-', '_' or '.'",
            "invalid_config_key",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_update_always_bumps_version() {
        let mut c = Config::new(
            ProjectId::new(),
            "flag".into(),
            "Flag".into(),
            None,
            serde_json::json!(true),
            None,
            UserId::new(),
            Utc::now(),
        );
        let before = c.version;
        c.apply_update(serde_json::json!(true), None, Vec::new(), Utc::now());
        assert_eq!(c.version, before + 1);
    }

    #[test]
    fn rejects_empty_key() {
        assert!(ensure_valid_key("").is_err());
    }

    #[test]
    fn rejects_key_with_illegal_characters() {
        assert!(ensure_valid_key("has space").is_err());
    }

    #[test]
    fn accepts_slug_key() {
        assert!(ensure_valid_key("my-flag_v2.1").is_ok());
    }
}
