// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! ReplicaService: the SDK-facing read path. Resolves every config in a
//! project for a given environment, applying the environment's variant
//! (if any) and returning its overrides to the caller unevaluated for
//! client-side SDK resolution (§4.8). The server never decides which
//! override wins — it only serves the base value, the raw condition
//! tree, and the version.
//!
//! Override *values* are never schema-checked at write time (only the
//! base value is, in `ConfigService`), so this is also where a config's
//! schema gets its one server-side use on the read path: each override
//! whose value fails the applicable schema is dropped before the
//! response is built, rather than handed to every SDK to discover on its
//! own.

use serde_json::Value;
use sqlx::SqlitePool;

use replane_domain::error::ReplaneError;
use replane_domain::ids::{EnvironmentId, ProjectId};
use replane_domain::services::json_schema::CompiledSchema;
use replane_domain::value_objects::override_rule::Override;

use crate::infrastructure::stores::{config_variants, configs};

/// A config resolved for a specific environment: its base value, the
/// raw (unevaluated) override list, and the version that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub key: String,
    pub value: Value,
    pub overrides: Vec<Override>,
    pub version: u64,
}

pub struct ReplicaService {
    pool: SqlitePool,
}

impl ReplicaService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolves every config in `project_id` for `environment_id`,
    /// applying the environment's variant (if any) in place of the
    /// config's default value.
    pub async fn get_project_configs(&self, project_id: ProjectId, environment_id: EnvironmentId) -> Result<Vec<ResolvedConfig>, ReplaneError> {
        let all_configs = configs::list_by_project(&self.pool, project_id).await?;

        let mut out = Vec::with_capacity(all_configs.len());
        for config in &all_configs {
            let variant = config_variants::get_by_config_and_environment(&self.pool, config.id, environment_id).await?;
            let (value, overrides, version, schema) = match variant {
                Some(variant) => {
                    let schema = if variant.use_base_schema { config.schema.clone() } else { variant.schema.clone() };
                    (variant.value, variant.overrides, variant.version, schema)
                }
                None => (config.value.clone(), config.overrides.clone(), config.version, config.schema.clone()),
            };

            let overrides = match schema.as_ref().and_then(|s| CompiledSchema::compile(s).ok()) {
                Some(compiled) => overrides.into_iter().filter(|ov| compiled.is_valid(&ov.value)).collect(),
                None => overrides,
            };

            out.push(ResolvedConfig { key: config.key.clone(), value, overrides, version });
        }
        Ok(out)
    }
}
