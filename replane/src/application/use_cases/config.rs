// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Config management use cases: CRUD over a project's configs plus the
//! direct-edit path, gated by whether the owning project requires
//! proposals for non-maintainers (§3, §4.4).

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::config::{self, Config, ConfigRole, ConfigUser};
use replane_domain::entities::version::ConfigVersion;
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::{ConfigId, ProjectId};
use replane_domain::services::json_schema;
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};
use replane_domain::value_objects::override_rule::Override;

use crate::application::services::config_service::ConfigService;
use crate::application::use_cases::roles::{config_role_for, project_access_for, project_role_for, require_project};
use crate::infrastructure::stores::{audit_logs, config_versions, configs};

pub struct ConfigUseCases {
    pool: SqlitePool,
    config_service: ConfigService,
}

impl ConfigUseCases {
    pub fn new(pool: SqlitePool) -> Self {
        let config_service = ConfigService::new(pool.clone());
        Self { pool, config_service }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        project_id: ProjectId,
        key: String,
        name: String,
        description: Option<String>,
        value: Value,
        schema: Option<Value>,
    ) -> Result<Config, ReplaneError> {
        config::ensure_valid_key(&key)?;
        let project = require_project(&self.pool, project_id).await?;
        let roles = self.project_roles(identity, &project).await?;
        if !is_allowed(identity, Action::CreateConfig, roles) {
            return Err(ReplaneError::forbidden("cannot create configs in this project"));
        }
        json_schema::validate_optional(schema.as_ref(), &value)?;

        if configs::get_by_key(&self.pool, project_id, &key).await?.is_some() {
            return Err(ReplaneError::conflict("a config with this key already exists in the project"));
        }

        let creator = identity.require_user().ok();
        let creator_id = identity.user_id().unwrap_or_default();
        let now = Utc::now();
        let cfg = Config::new(project_id, key.clone(), name, description, value, schema, creator_id, now);

        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        configs::create(&mut *tx, &cfg).await?;
        config_versions::create(
            &mut *tx,
            &ConfigVersion::snapshot(cfg.id, cfg.version, cfg.value.clone(), cfg.schema.clone(), cfg.overrides.clone(), creator_id, now),
        )
        .await?;
        if let Some(email) = creator {
            crate::infrastructure::stores::configs::upsert_user(&mut *tx, cfg.id, &ConfigUser { email: email.to_string(), role: ConfigRole::Maintainer }).await?;
        }
        audit_logs::create(
            &mut *tx,
            &AuditLog::new(identity.user_id(), Some(project_id), Some(cfg.id), AuditPayload::ConfigCreated { config_id: cfg.id, key }, now),
        )
        .await?;
        tx.commit().await.map_err(map_tx_err)?;

        Ok(cfg)
    }

    pub async fn get(&self, id: ConfigId) -> Result<Config, ReplaneError> {
        configs::get_by_id(&self.pool, id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))
    }

    pub async fn list_by_project(&self, project_id: ProjectId) -> Result<Vec<Config>, ReplaneError> {
        configs::list_by_project(&self.pool, project_id).await
    }

    /// Direct edit of a config's default variant. Refuses with
    /// `APPROVAL_REQUIRED` when the project requires proposals and the
    /// caller is not a maintainer/admin, steering callers toward
    /// `ProposalUseCases::create` instead (§3). `expected_version` must
    /// match the config's current version or the edit is rejected as a
    /// version mismatch — the caller loaded a stale copy.
    pub async fn update(
        &self,
        identity: &Identity,
        id: ConfigId,
        expected_version: u64,
        value: Value,
        schema: Option<Value>,
        overrides: Vec<Override>,
    ) -> Result<Config, ReplaneError> {
        let cfg = self.get(id).await?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, id).await?;
        if !is_allowed(identity, Action::EditConfigValue, roles) {
            return Err(ReplaneError::forbidden("cannot edit this config"));
        }
        if project.require_proposals && !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::approval_required("this project requires proposals for config edits; submit one instead"));
        }

        let actor = identity.user_id().unwrap_or_default();
        self.config_service.update_config(cfg, project.id, expected_version, value, schema, overrides, actor).await
    }

    pub async fn restore_version(&self, identity: &Identity, id: ConfigId, version: u64) -> Result<Config, ReplaneError> {
        let cfg = self.get(id).await?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, id).await?;
        if !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::forbidden("cannot restore versions of this config"));
        }

        let actor = identity.user_id().unwrap_or_default();
        self.config_service.restore_config_version(cfg, project.id, version, actor).await
    }

    pub async fn delete(&self, identity: &Identity, id: ConfigId) -> Result<(), ReplaneError> {
        let cfg = self.get(id).await?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, id).await?;
        if !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::forbidden("cannot delete this config"));
        }
        if project.require_proposals && !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::approval_required("this project requires proposals for config deletion; submit one instead"));
        }

        let actor = identity.user_id().unwrap_or_default();
        self.config_service.delete_config(cfg, project.id, actor).await
    }

    pub async fn list_versions(&self, id: ConfigId) -> Result<Vec<ConfigVersion>, ReplaneError> {
        config_versions::list_by_config(&self.pool, id).await
    }

    pub async fn list_users(&self, id: ConfigId) -> Result<Vec<ConfigUser>, ReplaneError> {
        configs::list_users(&self.pool, id).await
    }

    pub async fn upsert_user(&self, identity: &Identity, id: ConfigId, email: String, role: ConfigRole) -> Result<(), ReplaneError> {
        let cfg = self.get(id).await?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, id).await?;
        if !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::forbidden("cannot manage this config's users"));
        }
        configs::upsert_user(&self.pool, id, &ConfigUser { email: email.clone(), role }).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(project.id), Some(id), AuditPayload::ConfigMembersChanged { config_id: id }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_user(&self, identity: &Identity, id: ConfigId, email: String) -> Result<(), ReplaneError> {
        let cfg = self.get(id).await?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, id).await?;
        if !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::forbidden("cannot manage this config's users"));
        }
        configs::remove_user(&self.pool, id, &email).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(project.id), Some(id), AuditPayload::ConfigMembersChanged { config_id: id }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    async fn project_roles(&self, identity: &Identity, project: &replane_domain::entities::project::Project) -> Result<RoleContext, ReplaneError> {
        Ok(RoleContext {
            workspace_role: None,
            project_role: project_role_for(&self.pool, project.id, identity).await?,
            config_role: None,
            project_access: project_access_for(&self.pool, project, identity).await?,
        })
    }

    async fn config_roles(&self, identity: &Identity, project: &replane_domain::entities::project::Project, config_id: ConfigId) -> Result<RoleContext, ReplaneError> {
        Ok(RoleContext {
            workspace_role: None,
            project_role: project_role_for(&self.pool, project.id, identity).await?,
            config_role: config_role_for(&self.pool, config_id, identity).await?,
            project_access: project_access_for(&self.pool, project, identity).await?,
        })
    }
}

fn map_tx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}
