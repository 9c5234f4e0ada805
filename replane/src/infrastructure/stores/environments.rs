// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the `environments` table.

use sqlx::SqliteExecutor;

use replane_domain::entities::environment::Environment;
use replane_domain::error::ReplaneError;
use replane_domain::ids::{EnvironmentId, ProjectId};

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

pub async fn create(exec: impl SqliteExecutor<'_>, env: &Environment) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO environments (id, project_id, name, \"order\", require_proposals, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(env.id.to_string())
    .bind(env.project_id.to_string())
    .bind(&env.name)
    .bind(env.order)
    .bind(env.require_proposals)
    .bind(env.created_at)
    .bind(env.updated_at)
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(exec: impl SqliteExecutor<'_>, id: EnvironmentId) -> Result<Option<Environment>, ReplaneError> {
    let row = sqlx::query_as::<_, EnvironmentRow>(
        "SELECT id, project_id, name, \"order\", require_proposals, created_at, updated_at FROM environments WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(row.map(Into::into))
}

pub async fn list_by_project(exec: impl SqliteExecutor<'_>, project_id: ProjectId) -> Result<Vec<Environment>, ReplaneError> {
    let rows = sqlx::query_as::<_, EnvironmentRow>(
        "SELECT id, project_id, name, \"order\", require_proposals, created_at, updated_at
         FROM environments WHERE project_id = ? ORDER BY \"order\"",
    )
    .bind(project_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn count_by_project(exec: impl SqliteExecutor<'_>, project_id: ProjectId) -> Result<i64, ReplaneError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM environments WHERE project_id = ?")
        .bind(project_id.to_string())
        .fetch_one(exec)
        .await
        .map_err(map_sqlx_err)
}

pub async fn update(exec: impl SqliteExecutor<'_>, env: &Environment) -> Result<(), ReplaneError> {
    sqlx::query("UPDATE environments SET name = ?, \"order\" = ?, require_proposals = ?, updated_at = ? WHERE id = ?")
        .bind(&env.name)
        .bind(env.order)
        .bind(env.require_proposals)
        .bind(env.updated_at)
        .bind(env.id.to_string())
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: EnvironmentId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM environments WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct EnvironmentRow {
    id: String,
    project_id: String,
    name: String,
    order: i32,
    require_proposals: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<EnvironmentRow> for Environment {
    fn from(row: EnvironmentRow) -> Self {
        Environment {
            id: row.id.parse().expect("stored environment id is a valid uuid"),
            project_id: row.project_id.parse().expect("stored project id is a valid uuid"),
            name: row.name,
            order: row.order,
            require_proposals: row.require_proposals,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
