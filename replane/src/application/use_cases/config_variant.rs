// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Config variant use cases: per-environment overrides of a config's
//! value. Authority mirrors `ConfigUseCases` (a variant is scoped to its
//! config's project), but the proposal-required check looks at the
//! variant's *environment* rather than its project (§4.4).

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::config_variant::ConfigVariant;
use replane_domain::entities::version::ConfigVariantVersion;
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::{ConfigId, ConfigVariantId, EnvironmentId};
use replane_domain::services::json_schema;
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};
use replane_domain::value_objects::override_rule::Override;

use crate::application::services::config_service::ConfigService;
use crate::application::use_cases::roles::{config_role_for, project_access_for, project_role_for, require_project};
use crate::infrastructure::stores::{audit_logs, config_variant_versions, config_variants, configs, environments};

pub struct ConfigVariantUseCases {
    pool: SqlitePool,
    config_service: ConfigService,
}

impl ConfigVariantUseCases {
    pub fn new(pool: SqlitePool) -> Self {
        let config_service = ConfigService::new(pool.clone());
        Self { pool, config_service }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        config_id: ConfigId,
        environment_id: EnvironmentId,
        value: Value,
        schema: Option<Value>,
        use_base_schema: bool,
    ) -> Result<ConfigVariant, ReplaneError> {
        let cfg = configs::get_by_id(&self.pool, config_id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, config_id).await?;
        if !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::forbidden("cannot create variants for this config"));
        }

        let env = environments::get_by_id(&self.pool, environment_id).await?.ok_or_else(|| ReplaneError::not_found("no such environment"))?;
        if env.project_id != cfg.project_id {
            return Err(ReplaneError::bad_request("environment does not belong to the config's project"));
        }
        if config_variants::get_by_config_and_environment(&self.pool, config_id, environment_id).await?.is_some() {
            return Err(ReplaneError::conflict("a variant already exists for this config and environment"));
        }

        json_schema::validate_optional(schema.as_ref(), &value)?;
        if use_base_schema || schema.is_none() {
            json_schema::validate_optional(cfg.schema.as_ref(), &value)?;
        }

        let now = Utc::now();
        let variant = ConfigVariant::new(config_id, environment_id, value, schema, use_base_schema, now);
        let actor = identity.user_id().unwrap_or_default();

        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        config_variants::create(&mut *tx, &variant).await?;
        config_variant_versions::create(
            &mut *tx,
            &ConfigVariantVersion::snapshot(
                variant.id,
                variant.version,
                variant.value.clone(),
                variant.schema.clone(),
                variant.use_base_schema,
                variant.overrides.clone(),
                actor,
                now,
            ),
        )
        .await?;
        audit_logs::create(
            &mut *tx,
            &AuditLog::new(
                identity.user_id(),
                Some(project.id),
                Some(config_id),
                AuditPayload::ConfigVariantCreated { config_variant_id: variant.id, environment_id },
                now,
            ),
        )
        .await?;
        tx.commit().await.map_err(map_tx_err)?;

        Ok(variant)
    }

    pub async fn get(&self, id: ConfigVariantId) -> Result<ConfigVariant, ReplaneError> {
        config_variants::get_by_id(&self.pool, id).await?.ok_or_else(|| ReplaneError::not_found("no such config variant"))
    }

    pub async fn list_by_config(&self, config_id: ConfigId) -> Result<Vec<ConfigVariant>, ReplaneError> {
        config_variants::list_by_config(&self.pool, config_id).await
    }

    /// Direct edit of a variant. Refuses with `APPROVAL_REQUIRED` when the
    /// variant's environment requires proposals and the caller is not a
    /// maintainer/admin (§4.4). `expected_version` must match the
    /// variant's current version or the edit is rejected as a version
    /// mismatch.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        identity: &Identity,
        id: ConfigVariantId,
        expected_version: u64,
        value: Value,
        schema: Option<Value>,
        use_base_schema: bool,
        overrides: Vec<Override>,
    ) -> Result<ConfigVariant, ReplaneError> {
        let variant = self.get(id).await?;
        let cfg = configs::get_by_id(&self.pool, variant.config_id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let env = environments::get_by_id(&self.pool, variant.environment_id)
            .await?
            .ok_or_else(|| ReplaneError::not_found("no such environment"))?;
        let roles = self.config_roles(identity, &project, cfg.id).await?;
        if !is_allowed(identity, Action::EditConfigValue, roles) {
            return Err(ReplaneError::forbidden("cannot edit this variant"));
        }
        if env.require_proposals && !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::approval_required("this environment requires proposals for variant edits; submit one instead"));
        }

        let actor = identity.user_id().unwrap_or_default();
        self.config_service
            .update_variant(variant, project.id, expected_version, value, schema, use_base_schema, overrides, actor, cfg.schema.as_ref())
            .await
    }

    pub async fn restore_version(&self, identity: &Identity, id: ConfigVariantId, version: u64) -> Result<ConfigVariant, ReplaneError> {
        let variant = self.get(id).await?;
        let cfg = configs::get_by_id(&self.pool, variant.config_id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, cfg.id).await?;
        if !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::forbidden("cannot restore versions of this variant"));
        }

        let actor = identity.user_id().unwrap_or_default();
        self.config_service
            .restore_variant_version(variant, project.id, version, actor, cfg.schema.as_ref())
            .await
    }

    pub async fn delete(&self, identity: &Identity, id: ConfigVariantId) -> Result<(), ReplaneError> {
        let variant = self.get(id).await?;
        let cfg = configs::get_by_id(&self.pool, variant.config_id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, cfg.id).await?;
        if !is_allowed(identity, Action::ManageConfig, roles) {
            return Err(ReplaneError::forbidden("cannot delete this variant"));
        }

        let actor = identity.user_id().unwrap_or_default();
        self.config_service.delete_variant(variant, project.id, actor).await
    }

    pub async fn list_versions(&self, id: ConfigVariantId) -> Result<Vec<ConfigVariantVersion>, ReplaneError> {
        config_variant_versions::list_by_variant(&self.pool, id).await
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
