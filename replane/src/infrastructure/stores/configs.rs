// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the `configs` and `config_users` tables.

use sqlx::SqliteExecutor;

use replane_domain::entities::config::{Config, ConfigRole, ConfigUser};
use replane_domain::error::ReplaneError;
use replane_domain::ids::{ConfigId, ProjectId};
use replane_domain::value_objects::canonical_json;
use replane_domain::value_objects::override_rule::Override;

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

fn role_to_str(role: ConfigRole) -> &'static str {
    match role {
        ConfigRole::Editor => "editor",
        ConfigRole::Maintainer => "maintainer",
    }
}

fn role_from_str(s: &str) -> ConfigRole {
    match s {
        "maintainer" => ConfigRole::Maintainer,
        _ => ConfigRole::Editor,
    }
}

pub async fn create(exec: impl SqliteExecutor<'_>, config: &Config) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO configs (id, project_id, key, name, description, value, schema, overrides, version, created_at, updated_at, creator_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(config.id.to_string())
    .bind(config.project_id.to_string())
    .bind(&config.key)
    .bind(&config.name)
    .bind(&config.description)
    .bind(canonical_json::to_canonical_string(&config.value))
    .bind(config.schema.as_ref().map(canonical_json::to_canonical_string))
    .bind(canonical_json::to_canonical_string(&serde_json::to_value(&config.overrides)?))
    .bind(config.version as i64)
    .bind(config.created_at)
    .bind(config.updated_at)
    .bind(config.creator_id.to_string())
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(exec: impl SqliteExecutor<'_>, id: ConfigId) -> Result<Option<Config>, ReplaneError> {
    let row = sqlx::query_as::<_, ConfigRow>(
        "SELECT id, project_id, key, name, description, value, schema, overrides, version, created_at, updated_at, creator_id
         FROM configs WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn get_by_key(exec: impl SqliteExecutor<'_>, project_id: ProjectId, key: &str) -> Result<Option<Config>, ReplaneError> {
    let row = sqlx::query_as::<_, ConfigRow>(
        "SELECT id, project_id, key, name, description, value, schema, overrides, version, created_at, updated_at, creator_id
         FROM configs WHERE project_id = ? AND key = ?",
    )
    .bind(project_id.to_string())
    .bind(key)
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn list_by_project(exec: impl SqliteExecutor<'_>, project_id: ProjectId) -> Result<Vec<Config>, ReplaneError> {
    let rows = sqlx::query_as::<_, ConfigRow>(
        "SELECT id, project_id, key, name, description, value, schema, overrides, version, created_at, updated_at, creator_id
         FROM configs WHERE project_id = ? ORDER BY key",
    )
    .bind(project_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn update(exec: impl SqliteExecutor<'_>, config: &Config) -> Result<(), ReplaneError> {
    sqlx::query(
        "UPDATE configs SET name = ?, description = ?, value = ?, schema = ?, overrides = ?, version = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&config.name)
    .bind(&config.description)
    .bind(canonical_json::to_canonical_string(&config.value))
    .bind(config.schema.as_ref().map(canonical_json::to_canonical_string))
    .bind(canonical_json::to_canonical_string(&serde_json::to_value(&config.overrides)?))
    .bind(config.version as i64)
    .bind(config.updated_at)
    .bind(config.id.to_string())
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: ConfigId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM configs WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn list_users(exec: impl SqliteExecutor<'_>, config_id: ConfigId) -> Result<Vec<ConfigUser>, ReplaneError> {
    let rows = sqlx::query_as::<_, UserRow>("SELECT email, role FROM config_users WHERE config_id = ?")
        .bind(config_id.to_string())
        .fetch_all(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn upsert_user(exec: impl SqliteExecutor<'_>, config_id: ConfigId, user: &ConfigUser) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO config_users (config_id, email, role) VALUES (?, ?, ?)
         ON CONFLICT (config_id, email) DO UPDATE SET role = excluded.role",
    )
    .bind(config_id.to_string())
    .bind(&user.email)
    .bind(role_to_str(user.role))
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn remove_user(exec: impl SqliteExecutor<'_>, config_id: ConfigId, email: &str) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM config_users WHERE config_id = ? AND email = ?")
        .bind(config_id.to_string())
        .bind(email)
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    id: String,
    project_id: String,
    key: String,
    name: String,
    description: Option<String>,
    value: String,
    schema: Option<String>,
    overrides: String,
    version: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    creator_id: String,
}

impl TryFrom<ConfigRow> for Config {
    type Error = ReplaneError;

    fn try_from(row: ConfigRow) -> Result<Self, Self::Error> {
        Ok(Config {
            id: row.id.parse().expect("stored config id is a valid uuid"),
            project_id: row.project_id.parse().expect("stored project id is a valid uuid"),
            key: row.key,
            name: row.name,
            description: row.description,
            value: canonical_json::from_canonical_string(&row.value)?,
            schema: row.schema.map(|s| canonical_json::from_canonical_string(&s)).transpose()?,
            overrides: serde_json::from_str::<Vec<Override>>(&row.overrides)?,
            version: row.version as u64,
            created_at: row.created_at,
            updated_at: row.updated_at,
            creator_id: row.creator_id.parse().expect("stored creator id is a valid uuid"),
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    email: String,
    role: String,
}

impl From<UserRow> for ConfigUser {
    fn from(row: UserRow) -> Self {
        ConfigUser { email: row.email, role: role_from_str(&row.role) }
    }
}
