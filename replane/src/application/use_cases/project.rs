// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Project management use cases.

use chrono::Utc;
use sqlx::SqlitePool;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::project::{self, Project, ProjectRole, ProjectUser};
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::{ProjectId, WorkspaceId};
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};

use crate::application::use_cases::roles::{project_access_for, project_role_for, require_project, workspace_role_for};
use crate::infrastructure::stores::{audit_logs, projects};

pub struct ProjectUseCases {
    pool: SqlitePool,
}

impl ProjectUseCases {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Any workspace member may create a project within their workspace
    /// (§4.1); the creator becomes its first admin.
    pub async fn create(
        &self,
        identity: &Identity,
        workspace_id: WorkspaceId,
        name: String,
        description: Option<String>,
        require_proposals: bool,
        allow_self_approvals: bool,
    ) -> Result<Project, ReplaneError> {
        if !identity.is_superuser() && workspace_role_for(&self.pool, workspace_id, identity).await?.is_none() {
            return Err(ReplaneError::forbidden("must be a workspace member to create a project"));
        }
        let creator = identity.require_user()?;
        let now = Utc::now();
        let project = Project::new(workspace_id, name.clone(), description, require_proposals, allow_self_approvals, now);

        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        projects::create(&mut *tx, &project).await?;
        projects::upsert_user(&mut *tx, project.id, &ProjectUser { email: creator.to_string(), role: ProjectRole::Admin }).await?;
        audit_logs::create(
            &mut *tx,
            &AuditLog::new(
                identity.user_id(),
                Some(project.id),
                None,
                AuditPayload::ProjectCreated { project_id: project.id, name },
                now,
            ),
        )
        .await?;
        tx.commit().await.map_err(map_tx_err)?;

        Ok(project)
    }

    pub async fn get(&self, identity: &Identity, id: ProjectId) -> Result<Project, ReplaneError> {
        let project = require_project(&self.pool, id).await?;
        let roles = self.read_roles(identity, &project).await?;
        if !is_allowed(identity, Action::ReadProject, roles) {
            return Err(ReplaneError::forbidden("cannot read this project"));
        }
        Ok(project)
    }

    pub async fn list_by_workspace(&self, workspace_id: WorkspaceId) -> Result<Vec<Project>, ReplaneError> {
        projects::list_by_workspace(&self.pool, workspace_id).await
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: ProjectId,
        name: Option<String>,
        description: Option<String>,
        require_proposals: Option<bool>,
        allow_self_approvals: Option<bool>,
    ) -> Result<Project, ReplaneError> {
        let mut project = require_project(&self.pool, id).await?;
        let roles = self.write_roles(identity, &project).await?;
        if !is_allowed(identity, Action::ManageProject, roles) {
            return Err(ReplaneError::forbidden("cannot manage this project"));
        }

        if let Some(name) = name {
            project.name = name;
        }
        if description.is_some() {
            project.description = description;
        }
        if let Some(flag) = require_proposals {
            project.require_proposals = flag;
        }
        if let Some(flag) = allow_self_approvals {
            project.allow_self_approvals = flag;
        }
        project.updated_at = Utc::now();

        projects::update(&self.pool, &project).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(project.id), None, AuditPayload::ProjectUpdated { project_id: project.id }, project.updated_at),
        )
        .await?;
        Ok(project)
    }

    pub async fn delete(&self, identity: &Identity, id: ProjectId) -> Result<(), ReplaneError> {
        let project = require_project(&self.pool, id).await?;
        let roles = self.write_roles(identity, &project).await?;
        if !is_allowed(identity, Action::DeleteProject, roles) {
            return Err(ReplaneError::forbidden("cannot delete this project"));
        }

        let remaining = projects::count_by_workspace(&self.pool, project.workspace_id).await? - 1;
        project::ensure_can_delete(remaining.max(0) as usize)?;

        projects::delete(&self.pool, id).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(id), None, AuditPayload::ProjectDeleted { project_id: id, name: project.name }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    pub async fn list_users(&self, id: ProjectId) -> Result<Vec<ProjectUser>, ReplaneError> {
        projects::list_users(&self.pool, id).await
    }

    pub async fn upsert_user(&self, identity: &Identity, id: ProjectId, email: String, role: ProjectRole) -> Result<(), ReplaneError> {
        let project = require_project(&self.pool, id).await?;
        let roles = self.write_roles(identity, &project).await?;
        if !is_allowed(identity, Action::ManageProjectUsers, roles) {
            return Err(ReplaneError::forbidden("cannot manage this project's users"));
        }

        let mut users = projects::list_users(&self.pool, id).await?;
        users.retain(|u| u.email != email);
        users.push(ProjectUser { email: email.clone(), role });
        project::ensure_has_admin(&users)?;

        projects::upsert_user(&self.pool, id, &ProjectUser { email: email.clone(), role }).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(id), None, AuditPayload::ProjectMembersChanged { project_id: id }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_user(&self, identity: &Identity, id: ProjectId, email: String) -> Result<(), ReplaneError> {
        let project = require_project(&self.pool, id).await?;
        let roles = self.write_roles(identity, &project).await?;
        if !is_allowed(identity, Action::ManageProjectUsers, roles) {
            return Err(ReplaneError::forbidden("cannot manage this project's users"));
        }

        let users = projects::list_users(&self.pool, id).await?;
        let remaining: Vec<_> = users.into_iter().filter(|u| u.email != email).collect();
        project::ensure_has_admin(&remaining)?;

        projects::remove_user(&self.pool, id, &email).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(id), None, AuditPayload::ProjectMembersChanged { project_id: id }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    async fn read_roles(&self, identity: &Identity, project: &Project) -> Result<RoleContext, ReplaneError> {
        Ok(RoleContext {
            workspace_role: crate::application::use_cases::roles::workspace_role_for(&self.pool, project.workspace_id, identity).await?,
            project_role: project_role_for(&self.pool, project.id, identity).await?,
            config_role: None,
            project_access: project_access_for(&self.pool, project, identity).await?,
        })
    }

    async fn write_roles(&self, identity: &Identity, project: &Project) -> Result<RoleContext, ReplaneError> {
        Ok(RoleContext {
            workspace_role: None,
            project_role: project_role_for(&self.pool, project.id, identity).await?,
            config_role: None,
            project_access: project_access_for(&self.pool, project, identity).await?,
        })
    }
}

fn map_tx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}
