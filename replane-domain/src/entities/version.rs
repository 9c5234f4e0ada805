// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Immutable version snapshots. A row is appended every time a config or
//! variant is updated, never mutated or deleted; they back the history
//! and rollback views in §2.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ConfigId, ConfigVariantId, ConfigVariantVersionId, ConfigVersionId, UserId};
use crate::value_objects::override_rule::Override;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigVersion {
    pub id: ConfigVersionId,
    pub config_id: ConfigId,
    pub version: u64,
    pub value: Value,
    pub schema: Option<Value>,
    pub overrides: Vec<Override>,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl ConfigVersion {
    pub fn snapshot(
        config_id: ConfigId,
        version: u64,
        value: Value,
        schema: Option<Value>,
        overrides: Vec<Override>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self { id: ConfigVersionId::new(), config_id, version, value, schema, overrides, created_at: now, created_by }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigVariantVersion {
    pub id: ConfigVariantVersionId,
    pub config_variant_id: ConfigVariantId,
    pub version: u64,
    pub value: Value,
    pub schema: Option<Value>,
    pub use_base_schema: bool,
    pub overrides: Vec<Override>,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl ConfigVariantVersion {
    #[allow(clippy::too_many_arguments)]
    pub fn snapshot(
        config_variant_id: ConfigVariantId,
        version: u64,
        value: Value,
        schema: Option<Value>,
        use_base_schema: bool,
        overrides: Vec<Override>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConfigVariantVersionId::new(),
            config_variant_id,
            version,
            value,
            schema,
            use_base_schema,
            overrides,
            created_at: now,
            created_by,
        }
    }
}
