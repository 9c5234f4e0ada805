// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the `projects` and `project_users` tables.

use sqlx::SqliteExecutor;

use replane_domain::entities::project::{Project, ProjectRole, ProjectUser};
use replane_domain::error::ReplaneError;
use replane_domain::ids::{ProjectId, WorkspaceId};

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

fn role_to_str(role: ProjectRole) -> &'static str {
    match role {
        ProjectRole::Admin => "admin",
        ProjectRole::Maintainer => "maintainer",
    }
}

fn role_from_str(s: &str) -> ProjectRole {
    match s {
        "admin" => ProjectRole::Admin,
        _ => ProjectRole::Maintainer,
    }
}

pub async fn create(exec: impl SqliteExecutor<'_>, project: &Project) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO projects (id, workspace_id, name, description, require_proposals, allow_self_approvals, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(project.id.to_string())
    .bind(project.workspace_id.to_string())
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.require_proposals)
    .bind(project.allow_self_approvals)
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(exec: impl SqliteExecutor<'_>, id: ProjectId) -> Result<Option<Project>, ReplaneError> {
    let row = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, workspace_id, name, description, require_proposals, allow_self_approvals, created_at, updated_at
         FROM projects WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(row.map(Into::into))
}

pub async fn list_by_workspace(exec: impl SqliteExecutor<'_>, workspace_id: WorkspaceId) -> Result<Vec<Project>, ReplaneError> {
    let rows = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, workspace_id, name, description, require_proposals, allow_self_approvals, created_at, updated_at
         FROM projects WHERE workspace_id = ? ORDER BY name",
    )
    .bind(workspace_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn update(exec: impl SqliteExecutor<'_>, project: &Project) -> Result<(), ReplaneError> {
    sqlx::query(
        "UPDATE projects SET name = ?, description = ?, require_proposals = ?, allow_self_approvals = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.require_proposals)
    .bind(project.allow_self_approvals)
    .bind(project.updated_at)
    .bind(project.id.to_string())
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn count_by_workspace(exec: impl SqliteExecutor<'_>, workspace_id: WorkspaceId) -> Result<i64, ReplaneError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE workspace_id = ?")
        .bind(workspace_id.to_string())
        .fetch_one(exec)
        .await
        .map_err(map_sqlx_err)
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: ProjectId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM projects WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn list_users(exec: impl SqliteExecutor<'_>, project_id: ProjectId) -> Result<Vec<ProjectUser>, ReplaneError> {
    let rows = sqlx::query_as::<_, UserRow>("SELECT email, role FROM project_users WHERE project_id = ?")
        .bind(project_id.to_string())
        .fetch_all(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn upsert_user(exec: impl SqliteExecutor<'_>, project_id: ProjectId, user: &ProjectUser) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO project_users (project_id, email, role) VALUES (?, ?, ?)
         ON CONFLICT (project_id, email) DO UPDATE SET role = excluded.role",
    )
    .bind(project_id.to_string())
    .bind(&user.email)
    .bind(role_to_str(user.role))
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn remove_user(exec: impl SqliteExecutor<'_>, project_id: ProjectId, email: &str) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM project_users WHERE project_id = ? AND email = ?")
        .bind(project_id.to_string())
        .bind(email)
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    workspace_id: String,
    name: String,
    description: Option<String>,
    require_proposals: bool,
    allow_self_approvals: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id.parse().expect("stored project id is a valid uuid"),
            workspace_id: row.workspace_id.parse().expect("stored workspace id is a valid uuid"),
            name: row.name,
            description: row.description,
            require_proposals: row.require_proposals,
            allow_self_approvals: row.allow_self_approvals,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    email: String,
    role: String,
}

impl From<UserRow> for ProjectUser {
    fn from(row: UserRow) -> Self {
        ProjectUser { email: row.email, role: role_from_str(&row.role) }
    }
}
