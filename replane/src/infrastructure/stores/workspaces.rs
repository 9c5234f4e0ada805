// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the `workspaces` and `workspace_members` tables.
//!
//! Every function takes `impl SqliteExecutor` so callers can pass either a
//! pooled connection for reads or an open `Transaction` for a use case's
//! atomic write (§5: "a single transaction carrying every store handle").

use sqlx::SqliteExecutor;

use replane_domain::entities::workspace::{Workspace, WorkspaceMember, WorkspaceRole};
use replane_domain::error::ReplaneError;
use replane_domain::ids::WorkspaceId;

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

fn role_to_str(role: WorkspaceRole) -> &'static str {
    match role {
        WorkspaceRole::Admin => "admin",
        WorkspaceRole::Member => "member",
    }
}

fn role_from_str(s: &str) -> WorkspaceRole {
    match s {
        "admin" => WorkspaceRole::Admin,
        _ => WorkspaceRole::Member,
    }
}

pub async fn create(exec: impl SqliteExecutor<'_>, workspace: &Workspace) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO workspaces (id, name, auto_add_new_users, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(workspace.id.to_string())
    .bind(&workspace.name)
    .bind(workspace.auto_add_new_users)
    .bind(workspace.created_at)
    .bind(workspace.updated_at)
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(exec: impl SqliteExecutor<'_>, id: WorkspaceId) -> Result<Option<Workspace>, ReplaneError> {
    let row = sqlx::query_as::<_, WorkspaceRow>(
        "SELECT id, name, auto_add_new_users, created_at, updated_at FROM workspaces WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(row.map(Into::into))
}

pub async fn update(exec: impl SqliteExecutor<'_>, workspace: &Workspace) -> Result<(), ReplaneError> {
    sqlx::query("UPDATE workspaces SET name = ?, auto_add_new_users = ?, updated_at = ? WHERE id = ?")
        .bind(&workspace.name)
        .bind(workspace.auto_add_new_users)
        .bind(workspace.updated_at)
        .bind(workspace.id.to_string())
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: WorkspaceId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM workspaces WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn list_members(exec: impl SqliteExecutor<'_>, workspace_id: WorkspaceId) -> Result<Vec<WorkspaceMember>, ReplaneError> {
    let rows = sqlx::query_as::<_, MemberRow>("SELECT email, role FROM workspace_members WHERE workspace_id = ?")
        .bind(workspace_id.to_string())
        .fetch_all(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn upsert_member(
    exec: impl SqliteExecutor<'_>,
    workspace_id: WorkspaceId,
    member: &WorkspaceMember,
) -> Result<(), ReplaneError> {
    sqlx::query(
        "INSERT INTO workspace_members (workspace_id, email, role) VALUES (?, ?, ?)
         ON CONFLICT (workspace_id, email) DO UPDATE SET role = excluded.role",
    )
    .bind(workspace_id.to_string())
    .bind(&member.email)
    .bind(role_to_str(member.role))
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn remove_member(exec: impl SqliteExecutor<'_>, workspace_id: WorkspaceId, email: &str) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM workspace_members WHERE workspace_id = ? AND email = ?")
        .bind(workspace_id.to_string())
        .bind(email)
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: String,
    name: String,
    auto_add_new_users: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<WorkspaceRow> for Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Workspace {
            id: row.id.parse().expect("stored workspace id is a valid uuid"),
            name: row.name,
            auto_add_new_users: row.auto_add_new_users,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    email: String,
    role: String,
}

impl From<MemberRow> for WorkspaceMember {
    fn from(row: MemberRow) -> Self {
        WorkspaceMember { email: row.email, role: role_from_str(&row.role) }
    }
}
