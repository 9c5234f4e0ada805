// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the `sdk_keys` table.

use sqlx::SqliteExecutor;

use replane_domain::entities::sdk_key::SdkKey;
use replane_domain::error::ReplaneError;
use replane_domain::ids::{EnvironmentId, SdkKeyId};

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

pub async fn create(exec: impl SqliteExecutor<'_>, key: &SdkKey) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO sdk_keys (id, environment_id, name, key_hash, key_prefix, key_suffix, created_at, last_used_at, revoked_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(key.id.to_string())
    .bind(key.environment_id.to_string())
    .bind(&key.name)
    .bind(&key.key_hash)
    .bind(&key.key_prefix)
    .bind(&key.key_suffix)
    .bind(key.created_at)
    .bind(key.last_used_at)
    .bind(key.revoked_at)
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(exec: impl SqliteExecutor<'_>, id: SdkKeyId) -> Result<Option<SdkKey>, ReplaneError> {
    let row = sqlx::query_as::<_, KeyRow>(
        "SELECT id, environment_id, name, key_hash, key_prefix, key_suffix, created_at, last_used_at, revoked_at
         FROM sdk_keys WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(row.map(Into::into))
}

/// Looks up every non-revoked key for an environment, for listing in the
/// admin UI (verification itself resolves the row directly by the id
/// embedded in the token, see `token_codec`).
pub async fn list_active_by_environment(exec: impl SqliteExecutor<'_>, environment_id: EnvironmentId) -> Result<Vec<SdkKey>, ReplaneError> {
    let rows = sqlx::query_as::<_, KeyRow>(
        "SELECT id, environment_id, name, key_hash, key_prefix, key_suffix, created_at, last_used_at, revoked_at
         FROM sdk_keys WHERE environment_id = ? AND revoked_at IS NULL",
    )
    .bind(environment_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn list_by_environment(exec: impl SqliteExecutor<'_>, environment_id: EnvironmentId) -> Result<Vec<SdkKey>, ReplaneError> {
    let rows = sqlx::query_as::<_, KeyRow>(
        "SELECT id, environment_id, name, key_hash, key_prefix, key_suffix, created_at, last_used_at, revoked_at
         FROM sdk_keys WHERE environment_id = ? ORDER BY created_at",
    )
    .bind(environment_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn record_use(exec: impl SqliteExecutor<'_>, id: SdkKeyId, now: chrono::DateTime<chrono::Utc>) -> Result<(), ReplaneError> {
    sqlx::query("UPDATE sdk_keys SET last_used_at = ? WHERE id = ?")
        .bind(now)
        .bind(id.to_string())
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn revoke(exec: impl SqliteExecutor<'_>, id: SdkKeyId, now: chrono::DateTime<chrono::Utc>) -> Result<(), ReplaneError> {
    sqlx::query("UPDATE sdk_keys SET revoked_at = ? WHERE id = ?")
        .bind(now)
        .bind(id.to_string())
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn rename(exec: impl SqliteExecutor<'_>, id: SdkKeyId, name: &str) -> Result<(), ReplaneError> {
    sqlx::query("UPDATE sdk_keys SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id.to_string())
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: SdkKeyId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM sdk_keys WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct KeyRow {
    id: String,
    environment_id: String,
    name: String,
    key_hash: String,
    key_prefix: String,
    key_suffix: String,
    created_at: chrono::DateTime<chrono::Utc>,
    last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    revoked_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<KeyRow> for SdkKey {
    fn from(row: KeyRow) -> Self {
        SdkKey {
            id: row.id.parse().expect("stored key id is a valid uuid"),
            environment_id: row.environment_id.parse().expect("stored environment id is a valid uuid"),
            name: row.name,
            key_hash: row.key_hash,
            key_prefix: row.key_prefix,
            key_suffix: row.key_suffix,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
            revoked_at: row.revoked_at,
        }
    }
}
