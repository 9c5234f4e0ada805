// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the append-only `config_versions` table.

use sqlx::SqliteExecutor;

use replane_domain::entities::version::ConfigVersion;
use replane_domain::error::ReplaneError;
use replane_domain::ids::ConfigId;
use replane_domain::value_objects::canonical_json;
use replane_domain::value_objects::override_rule::Override;

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

pub async fn create(exec: impl SqliteExecutor<'_>, snapshot: &ConfigVersion) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO config_versions (id, config_id, version, value, schema, overrides, created_at, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(snapshot.id.to_string())
    .bind(snapshot.config_id.to_string())
    .bind(snapshot.version as i64)
    .bind(canonical_json::to_canonical_string(&snapshot.value))
    .bind(snapshot.schema.as_ref().map(canonical_json::to_canonical_string))
    .bind(canonical_json::to_canonical_string(&serde_json::to_value(&snapshot.overrides)?))
    .bind(snapshot.created_at)
    .bind(snapshot.created_by.to_string())
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_config_and_version(
    exec: impl SqliteExecutor<'_>,
    config_id: ConfigId,
    version: u64,
) -> Result<Option<ConfigVersion>, ReplaneError> {
    let row = sqlx::query_as::<_, VersionRow>(
        "SELECT id, config_id, version, value, schema, overrides, created_at, created_by
         FROM config_versions WHERE config_id = ? AND version = ?",
    )
    .bind(config_id.to_string())
    .bind(version as i64)
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn list_by_config(exec: impl SqliteExecutor<'_>, config_id: ConfigId) -> Result<Vec<ConfigVersion>, ReplaneError> {
    let rows = sqlx::query_as::<_, VersionRow>(
        "SELECT id, config_id, version, value, schema, overrides, created_at, created_by
         FROM config_versions WHERE config_id = ? ORDER BY version DESC",
    )
    .bind(config_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    id: String,
    config_id: String,
    version: i64,
    value: String,
    schema: Option<String>,
    overrides: String,
    created_at: chrono::DateTime<chrono::Utc>,
    created_by: String,
}

impl TryFrom<VersionRow> for ConfigVersion {
    type Error = ReplaneError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        Ok(ConfigVersion {
            id: row.id.parse().expect("stored version id is a valid uuid"),
            config_id: row.config_id.parse().expect("stored config id is a valid uuid"),
            version: row.version as u64,
            value: canonical_json::from_canonical_string(&row.value)?,
            schema: row.schema.map(|s| canonical_json::from_canonical_string(&s)).transpose()?,
            overrides: serde_json::from_str::<Vec<Override>>(&row.overrides)?,
            created_at: row.created_at,
            created_by: row.created_by.parse().expect("stored user id is a valid uuid"),
        })
    }
}
