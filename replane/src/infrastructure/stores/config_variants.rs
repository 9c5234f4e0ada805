// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the `config_variants` table.

use sqlx::SqliteExecutor;

use replane_domain::entities::config_variant::ConfigVariant;
use replane_domain::error::ReplaneError;
use replane_domain::ids::{ConfigId, ConfigVariantId, EnvironmentId};
use replane_domain::value_objects::canonical_json;
use replane_domain::value_objects::override_rule::Override;

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

pub async fn create(exec: impl SqliteExecutor<'_>, variant: &ConfigVariant) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO config_variants (id, config_id, environment_id, value, schema, use_base_schema, overrides, version, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(variant.id.to_string())
    .bind(variant.config_id.to_string())
    .bind(variant.environment_id.to_string())
    .bind(canonical_json::to_canonical_string(&variant.value))
    .bind(variant.schema.as_ref().map(canonical_json::to_canonical_string))
    .bind(variant.use_base_schema)
    .bind(canonical_json::to_canonical_string(&serde_json::to_value(&variant.overrides)?))
    .bind(variant.version as i64)
    .bind(variant.created_at)
    .bind(variant.updated_at)
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(exec: impl SqliteExecutor<'_>, id: ConfigVariantId) -> Result<Option<ConfigVariant>, ReplaneError> {
    let row = sqlx::query_as::<_, VariantRow>(
        "SELECT id, config_id, environment_id, value, schema, use_base_schema, overrides, version, created_at, updated_at
         FROM config_variants WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn get_by_config_and_environment(
    exec: impl SqliteExecutor<'_>,
    config_id: ConfigId,
    environment_id: EnvironmentId,
) -> Result<Option<ConfigVariant>, ReplaneError> {
    let row = sqlx::query_as::<_, VariantRow>(
        "SELECT id, config_id, environment_id, value, schema, use_base_schema, overrides, version, created_at, updated_at
         FROM config_variants WHERE config_id = ? AND environment_id = ?",
    )
    .bind(config_id.to_string())
    .bind(environment_id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn list_by_config(exec: impl SqliteExecutor<'_>, config_id: ConfigId) -> Result<Vec<ConfigVariant>, ReplaneError> {
    let rows = sqlx::query_as::<_, VariantRow>(
        "SELECT id, config_id, environment_id, value, schema, use_base_schema, overrides, version, created_at, updated_at
         FROM config_variants WHERE config_id = ?",
    )
    .bind(config_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn update(exec: impl SqliteExecutor<'_>, variant: &ConfigVariant) -> Result<(), ReplaneError> {
    sqlx::query(
        "UPDATE config_variants SET value = ?, schema = ?, use_base_schema = ?, overrides = ?, version = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(canonical_json::to_canonical_string(&variant.value))
    .bind(variant.schema.as_ref().map(canonical_json::to_canonical_string))
    .bind(variant.use_base_schema)
    .bind(canonical_json::to_canonical_string(&serde_json::to_value(&variant.overrides)?))
    .bind(variant.version as i64)
    .bind(variant.updated_at)
    .bind(variant.id.to_string())
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: ConfigVariantId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM config_variants WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: String,
    config_id: String,
    environment_id: String,
    value: String,
    schema: Option<String>,
    use_base_schema: bool,
    overrides: String,
    version: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<VariantRow> for ConfigVariant {
    type Error = ReplaneError;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        Ok(ConfigVariant {
            id: row.id.parse().expect("stored variant id is a valid uuid"),
            config_id: row.config_id.parse().expect("stored config id is a valid uuid"),
            environment_id: row.environment_id.parse().expect("stored environment id is a valid uuid"),
            value: canonical_json::from_canonical_string(&row.value)?,
            schema: row.schema.map(|s| canonical_json::from_canonical_string(&s)).transpose()?,
            use_base_schema: row.use_base_schema,
            overrides: serde_json::from_str::<Vec<Override>>(&row.overrides)?,
            version: row.version as u64,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
