// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to `admin_api_keys` and its `admin_api_key_scopes` /
//! `admin_api_key_projects` junction tables.

use sqlx::SqliteExecutor;

use replane_domain::entities::admin_api_key::AdminApiKey;
use replane_domain::error::ReplaneError;
use replane_domain::identity::Scope;
use replane_domain::ids::{AdminApiKeyId, WorkspaceId};

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

fn scope_to_str(scope: Scope) -> &'static str {
    match scope {
        Scope::ProjectRead => "project_read",
        Scope::ProjectWrite => "project_write",
        Scope::ConfigRead => "config_read",
        Scope::ConfigWrite => "config_write",
        Scope::EnvironmentRead => "environment_read",
        Scope::EnvironmentWrite => "environment_write",
        Scope::SdkKeyRead => "sdk_key_read",
        Scope::SdkKeyWrite => "sdk_key_write",
        Scope::MemberRead => "member_read",
        Scope::MemberWrite => "member_write",
    }
}

fn scope_from_str(s: &str) -> Option<Scope> {
    Some(match s {
        "project_read" => Scope::ProjectRead,
        "project_write" => Scope::ProjectWrite,
        "config_read" => Scope::ConfigRead,
        "config_write" => Scope::ConfigWrite,
        "environment_read" => Scope::EnvironmentRead,
        "environment_write" => Scope::EnvironmentWrite,
        "sdk_key_read" => Scope::SdkKeyRead,
        "sdk_key_write" => Scope::SdkKeyWrite,
        "member_read" => Scope::MemberRead,
        "member_write" => Scope::MemberWrite,
        _ => return None,
    })
}

/// Persists the key row plus its scope and project-restriction rows. Callers
/// are expected to run this inside a transaction alongside any related audit
/// log write.
pub async fn create(pool: &sqlx::SqlitePool, key: &AdminApiKey) -> Result<(), ReplaneError> {
    let mut tx = pool.begin().await.map_err(map_sqlx_err)?;

    sqlx::query(
        "INSERT INTO admin_api_keys (id, workspace_id, name, key_hash, key_prefix, key_suffix, created_at, last_used_at, revoked_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(key.id.to_string())
    .bind(key.workspace_id.to_string())
    .bind(&key.name)
    .bind(&key.key_hash)
    .bind(&key.key_prefix)
    .bind(&key.key_suffix)
    .bind(key.created_at)
    .bind(key.last_used_at)
    .bind(key.revoked_at)
    .execute(&mut *tx)
    .await
    .map_err(map_sqlx_err)?;

    for scope in &key.scopes {
        sqlx::query("INSERT INTO admin_api_key_scopes (admin_api_key_id, scope) VALUES (?, ?)")
            .bind(key.id.to_string())
            .bind(scope_to_str(*scope))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
    }

    if let Some(project_ids) = &key.project_ids {
        for project_id in project_ids {
            sqlx::query("INSERT INTO admin_api_key_projects (admin_api_key_id, project_id) VALUES (?, ?)")
                .bind(key.id.to_string())
                .bind(project_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        }
    }

    tx.commit().await.map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(pool: &sqlx::SqlitePool, id: AdminApiKeyId) -> Result<Option<AdminApiKey>, ReplaneError> {
    let row = sqlx::query_as::<_, KeyRow>(
        "SELECT id, workspace_id, name, key_hash, key_prefix, key_suffix, created_at, last_used_at, revoked_at
         FROM admin_api_keys WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_err)?;
    let Some(row) = row else { return Ok(None) };
    Ok(Some(hydrate(pool, row).await?))
}

pub async fn list_by_workspace(pool: &sqlx::SqlitePool, workspace_id: WorkspaceId) -> Result<Vec<AdminApiKey>, ReplaneError> {
    let rows = sqlx::query_as::<_, KeyRow>(
        "SELECT id, workspace_id, name, key_hash, key_prefix, key_suffix, created_at, last_used_at, revoked_at
         FROM admin_api_keys WHERE workspace_id = ? ORDER BY created_at",
    )
    .bind(workspace_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_err)?;

    let mut keys = Vec::with_capacity(rows.len());
    for row in rows {
        keys.push(hydrate(pool, row).await?);
    }
    Ok(keys)
}

async fn hydrate(pool: &sqlx::SqlitePool, row: KeyRow) -> Result<AdminApiKey, ReplaneError> {
    let scope_rows: Vec<(String,)> = sqlx::query_as("SELECT scope FROM admin_api_key_scopes WHERE admin_api_key_id = ?")
        .bind(&row.id)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_err)?;
    let scopes = scope_rows.into_iter().filter_map(|(s,)| scope_from_str(&s)).collect();

    let project_rows: Vec<(String,)> = sqlx::query_as("SELECT project_id FROM admin_api_key_projects WHERE admin_api_key_id = ?")
        .bind(&row.id)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_err)?;
    let project_ids = if project_rows.is_empty() {
        None
    } else {
        Some(
            project_rows
                .into_iter()
                .map(|(s,)| s.parse().expect("stored project id is a valid uuid"))
                .collect(),
        )
    };

    Ok(AdminApiKey {
        id: row.id.parse().expect("stored key id is a valid uuid"),
        workspace_id: row.workspace_id.parse().expect("stored workspace id is a valid uuid"),
        name: row.name,
        project_ids,
        scopes,
        key_hash: row.key_hash,
        key_prefix: row.key_prefix,
        key_suffix: row.key_suffix,
        created_at: row.created_at,
        last_used_at: row.last_used_at,
        revoked_at: row.revoked_at,
    })
}

pub async fn record_use(exec: impl SqliteExecutor<'_>, id: AdminApiKeyId, now: chrono::DateTime<chrono::Utc>) -> Result<(), ReplaneError> {
    sqlx::query("UPDATE admin_api_keys SET last_used_at = ? WHERE id = ?")
        .bind(now)
        .bind(id.to_string())
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn revoke(exec: impl SqliteExecutor<'_>, id: AdminApiKeyId, now: chrono::DateTime<chrono::Utc>) -> Result<(), ReplaneError> {
    sqlx::query("UPDATE admin_api_keys SET revoked_at = ? WHERE id = ?")
        .bind(now)
        .bind(id.to_string())
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: AdminApiKeyId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM admin_api_keys WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct KeyRow {
    id: String,
    workspace_id: String,
    name: String,
    key_hash: String,
    key_prefix: String,
    key_suffix: String,
    created_at: chrono::DateTime<chrono::Utc>,
    last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    revoked_at: Option<chrono::DateTime<chrono::Utc>>,
}
