// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared role-resolution helpers used by every use case before calling
//! `permission_service::is_allowed`. API key identities carry their
//! authority as scopes, not membership rows, so these only ever resolve a
//! role for `Identity::User` (and `Superuser`, trivially bypassed by
//! `is_allowed` itself).

use sqlx::SqlitePool;

use replane_domain::entities::config::ConfigRole;
use replane_domain::entities::project::{Project, ProjectRole};
use replane_domain::entities::workspace::WorkspaceRole;
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::{ConfigId, ProjectId, WorkspaceId};

use crate::infrastructure::stores::{configs, projects, workspaces};

pub async fn workspace_role_for(
    pool: &SqlitePool,
    workspace_id: WorkspaceId,
    identity: &Identity,
) -> Result<Option<WorkspaceRole>, ReplaneError> {
    let Identity::User { email, .. } = identity else { return Ok(None) };
    let members = workspaces::list_members(pool, workspace_id).await?;
    Ok(members.into_iter().find(|m| &m.email == email).map(|m| m.role))
}

pub async fn project_role_for(pool: &SqlitePool, project_id: ProjectId, identity: &Identity) -> Result<Option<ProjectRole>, ReplaneError> {
    let Identity::User { email, .. } = identity else { return Ok(None) };
    let users = projects::list_users(pool, project_id).await?;
    Ok(users.into_iter().find(|u| &u.email == email).map(|u| u.role))
}

pub async fn config_role_for(pool: &SqlitePool, config_id: ConfigId, identity: &Identity) -> Result<Option<ConfigRole>, ReplaneError> {
    let Identity::User { email, .. } = identity else { return Ok(None) };
    let users = configs::list_users(pool, config_id).await?;
    Ok(users.into_iter().find(|u| &u.email == email).map(|u| u.role))
}

/// `true` if `identity` is allowed onto `project` at all. For users this
/// additionally requires workspace membership, resolved the same way
/// `workspace_role_for` does; for API keys `Identity::has_project_access`
/// already encodes the whole check.
pub async fn project_access_for(pool: &SqlitePool, project: &Project, identity: &Identity) -> Result<bool, ReplaneError> {
    match identity {
        Identity::User { .. } => Ok(workspace_role_for(pool, project.workspace_id, identity).await?.is_some()),
        _ => Ok(identity.has_project_access(project.id, project.workspace_id)),
    }
}

pub async fn require_project(pool: &SqlitePool, project_id: ProjectId) -> Result<Project, ReplaneError> {
    projects::get_by_id(pool, project_id).await?.ok_or_else(|| ReplaneError::not_found("no such project"))
}
