// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SDK key use cases. Each key is scoped to a single environment and is
//! verified on the hot config-read path (`services::sdk_verifier`); a
//! revoke here must also evict the verifier's cache so the change takes
//! effect immediately rather than at the end of the cache TTL (§4.2).

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::sdk_key::SdkKey;
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::{EnvironmentId, SdkKeyId};
use replane_domain::services::hashing_service;
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};
use replane_domain::services::token_codec::{self, SDK_KEY_PREFIX};

use crate::application::services::sdk_verifier::SdkVerifier;
use crate::application::use_cases::roles::{project_access_for, project_role_for, require_project};
use crate::infrastructure::stores::{audit_logs, environments, sdk_keys};

pub struct SdkKeyUseCases {
    pool: SqlitePool,
    verifier: Arc<SdkVerifier>,
}

pub struct CreatedSdkKey {
    pub key: SdkKey,
    pub token: String,
}

impl SdkKeyUseCases {
    pub fn new(pool: SqlitePool, verifier: Arc<SdkVerifier>) -> Self {
        Self { pool, verifier }
    }

    pub async fn create(&self, identity: &Identity, environment_id: EnvironmentId, name: String) -> Result<CreatedSdkKey, ReplaneError> {
        let env = environments::get_by_id(&self.pool, environment_id).await?.ok_or_else(|| ReplaneError::not_found("no such environment"))?;
        self.require_manage(identity, env.project_id).await?;

        let built = token_codec::build(SDK_KEY_PREFIX, uuid::Uuid::now_v7());
        let key_hash = hashing_service::hash_sdk_key(&built.token);
        let now = Utc::now();
        let key = SdkKey::new(environment_id, name.clone(), key_hash, built.key_prefix, built.key_suffix, now);

        sdk_keys::create(&self.pool, &key).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(
                identity.user_id(),
                Some(env.project_id),
                None,
                AuditPayload::SdkKeyCreated { sdk_key_id: key.id, environment_id, name },
                now,
            ),
        )
        .await?;

        Ok(CreatedSdkKey { key, token: built.token })
    }

    pub async fn get(&self, id: SdkKeyId) -> Result<SdkKey, ReplaneError> {
        sdk_keys::get_by_id(&self.pool, id).await?.ok_or_else(|| ReplaneError::not_found("no such SDK key"))
    }

    pub async fn list_active_by_environment(&self, environment_id: EnvironmentId) -> Result<Vec<SdkKey>, ReplaneError> {
        sdk_keys::list_active_by_environment(&self.pool, environment_id).await
    }

    pub async fn list_by_environment(&self, environment_id: EnvironmentId) -> Result<Vec<SdkKey>, ReplaneError> {
        sdk_keys::list_by_environment(&self.pool, environment_id).await
    }

    pub async fn rename(&self, identity: &Identity, id: SdkKeyId, name: String) -> Result<(), ReplaneError> {
        let key = self.get(id).await?;
        let env = environments::get_by_id(&self.pool, key.environment_id).await?.ok_or_else(|| ReplaneError::not_found("no such environment"))?;
        self.require_manage(identity, env.project_id).await?;

        sdk_keys::rename(&self.pool, id, &name).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(env.project_id), None, AuditPayload::SdkKeyUpdated { sdk_key_id: id, name }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    pub async fn revoke(&self, identity: &Identity, id: SdkKeyId) -> Result<(), ReplaneError> {
        let key = self.get(id).await?;
        let env = environments::get_by_id(&self.pool, key.environment_id).await?.ok_or_else(|| ReplaneError::not_found("no such environment"))?;
        self.require_manage(identity, env.project_id).await?;

        sdk_keys::revoke(&self.pool, id, Utc::now()).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(env.project_id), None, AuditPayload::SdkKeyDeleted { sdk_key_id: id, name: key.name.clone() }, Utc::now()),
        )
        .await?;

        self.verifier.invalidate_key(id).await;
        Ok(())
    }

    pub async fn delete(&self, identity: &Identity, id: SdkKeyId) -> Result<(), ReplaneError> {
        let key = self.get(id).await?;
        let env = environments::get_by_id(&self.pool, key.environment_id).await?.ok_or_else(|| ReplaneError::not_found("no such environment"))?;
        self.require_manage(identity, env.project_id).await?;

        sdk_keys::delete(&self.pool, id).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), Some(env.project_id), None, AuditPayload::SdkKeyDeleted { sdk_key_id: id, name: key.name }, Utc::now()),
        )
        .await?;

        self.verifier.invalidate_key(id).await;
        Ok(())
    }

    async fn require_manage(&self, identity: &Identity, project_id: replane_domain::ids::ProjectId) -> Result<(), ReplaneError> {
        let project = require_project(&self.pool, project_id).await?;
        let roles = RoleContext {
            workspace_role: None,
            project_role: project_role_for(&self.pool, project_id, identity).await?,
            config_role: None,
            project_access: project_access_for(&self.pool, &project, identity).await?,
        };
        if !is_allowed(identity, Action::ManageSdkKeys, roles) {
            return Err(ReplaneError::forbidden("cannot manage this project's SDK keys"));
        }
        Ok(())
    }
}
