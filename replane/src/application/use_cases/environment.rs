// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Environment management use cases.

use chrono::Utc;
use sqlx::SqlitePool;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::environment::{self, Environment};
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::{EnvironmentId, ProjectId};
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};

use crate::application::use_cases::roles::{project_access_for, project_role_for, require_project};
use crate::infrastructure::stores::{audit_logs, environments};

pub struct EnvironmentUseCases {
    pool: SqlitePool,
}

impl EnvironmentUseCases {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, identity: &Identity, project_id: ProjectId, name: String, order: i32, require_proposals: bool) -> Result<Environment, ReplaneError> {
        let project = require_project(&self.pool, project_id).await?;
        self.require_manage(identity, &project).await?;

        let now = Utc::now();
        let env = Environment::new(project_id, name.clone(), order, require_proposals, now);
        environments::create(&self.pool, &env).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(project_id), None, AuditPayload::EnvironmentCreated { environment_id: env.id, name }, now),
        )
        .await?;
        Ok(env)
    }

    pub async fn get(&self, id: EnvironmentId) -> Result<Environment, ReplaneError> {
        environments::get_by_id(&self.pool, id).await?.ok_or_else(|| ReplaneError::not_found("no such environment"))
    }

    pub async fn list_by_project(&self, project_id: ProjectId) -> Result<Vec<Environment>, ReplaneError> {
        environments::list_by_project(&self.pool, project_id).await
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: EnvironmentId,
        name: Option<String>,
        order: Option<i32>,
        require_proposals: Option<bool>,
    ) -> Result<Environment, ReplaneError> {
        let mut env = self.get(id).await?;
        let project = require_project(&self.pool, env.project_id).await?;
        self.require_manage(identity, &project).await?;

        if let Some(name) = name {
            env.name = name;
        }
        if let Some(order) = order {
            env.order = order;
        }
        if let Some(flag) = require_proposals {
            env.require_proposals = flag;
        }
        env.updated_at = Utc::now();

        environments::update(&self.pool, &env).await?;
        Ok(env)
    }

    /// Deletes an environment, refusing when it is the project's last one
    /// (§3).
    pub async fn delete(&self, identity: &Identity, id: EnvironmentId) -> Result<(), ReplaneError> {
        let env = self.get(id).await?;
        let project = require_project(&self.pool, env.project_id).await?;
        self.require_manage(identity, &project).await?;

        let remaining = environments::count_by_project(&self.pool, env.project_id).await? - 1;
        environment::ensure_can_delete(remaining.max(0) as usize)?;

        environments::delete(&self.pool, id).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(env.project_id), None, AuditPayload::EnvironmentDeleted { environment_id: id, name: env.name }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    async fn require_manage(&self, identity: &Identity, project: &replane_domain::entities::project::Project) -> Result<(), ReplaneError> {
        let roles = RoleContext {
            workspace_role: None,
            project_role: project_role_for(&self.pool, project.id, identity).await?,
            config_role: None,
            project_access: project_access_for(&self.pool, project, identity).await?,
        };
        if !is_allowed(identity, Action::ManageEnvironments, roles) {
            return Err(ReplaneError::forbidden("cannot manage this project's environments"));
        }
        Ok(())
    }
}
