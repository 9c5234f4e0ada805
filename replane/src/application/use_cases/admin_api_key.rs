// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Admin API key use cases. These keys authenticate management-API
//! callers, distinct from `SdkKeyUseCases`, which issues runtime-read
//! credentials (§4.1, §4.2).

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

use replane_domain::entities::admin_api_key::AdminApiKey;
use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::error::ReplaneError;
use replane_domain::identity::{Identity, Scope};
use replane_domain::ids::{AdminApiKeyId, ProjectId, WorkspaceId};
use replane_domain::services::hashing_service;
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};
use replane_domain::services::token_codec::{self, ADMIN_KEY_PREFIX};

use crate::application::services::admin_api_key_verifier::AdminApiKeyVerifier;
use crate::application::use_cases::roles::workspace_role_for;
use crate::infrastructure::stores::{admin_api_keys, audit_logs};

pub struct AdminApiKeyUseCases {
    pool: SqlitePool,
    verifier: Arc<AdminApiKeyVerifier>,
}

/// The full token, returned only at creation time; the stored key never
/// carries it again.
pub struct CreatedAdminApiKey {
    pub key: AdminApiKey,
    pub token: String,
}

impl AdminApiKeyUseCases {
    pub fn new(pool: SqlitePool, verifier: Arc<AdminApiKeyVerifier>) -> Self {
        Self { pool, verifier }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        workspace_id: WorkspaceId,
        name: String,
        project_ids: Option<Vec<ProjectId>>,
        scopes: Vec<Scope>,
    ) -> Result<CreatedAdminApiKey, ReplaneError> {
        self.require_admin(identity, workspace_id).await?;

        let built = token_codec::build(ADMIN_KEY_PREFIX, uuid::Uuid::now_v7());
        let key_hash = hashing_service::hash_admin_key(&built.token)?;
        let now = Utc::now();
        let key = AdminApiKey::new(workspace_id, name.clone(), project_ids, scopes, key_hash, built.key_prefix, built.key_suffix, now);

        admin_api_keys::create(&self.pool, &key).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), None, None, AuditPayload::AdminApiKeyCreated { admin_api_key_id: key.id, name }, now),
        )
        .await?;

        Ok(CreatedAdminApiKey { key, token: built.token })
    }

    pub async fn get(&self, id: AdminApiKeyId) -> Result<AdminApiKey, ReplaneError> {
        admin_api_keys::get_by_id(&self.pool, id).await?.ok_or_else(|| ReplaneError::not_found("no such admin API key"))
    }

    pub async fn list_by_workspace(&self, workspace_id: WorkspaceId) -> Result<Vec<AdminApiKey>, ReplaneError> {
        admin_api_keys::list_by_workspace(&self.pool, workspace_id).await
    }

    pub async fn revoke(&self, identity: &Identity, id: AdminApiKeyId) -> Result<(), ReplaneError> {
        let key = self.get(id).await?;
        self.require_admin(identity, key.workspace_id).await?;

        admin_api_keys::revoke(&self.pool, id, Utc::now()).await?;
        self.verifier.invalidate_key(id).await;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), None, None, AuditPayload::AdminApiKeyDeleted { admin_api_key_id: id, name: key.name }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    pub async fn delete(&self, identity: &Identity, id: AdminApiKeyId) -> Result<(), ReplaneError> {
        let key = self.get(id).await?;
        self.require_admin(identity, key.workspace_id).await?;

        admin_api_keys::delete(&self.pool, id).await?;
        self.verifier.invalidate_key(id).await;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), None, None, AuditPayload::AdminApiKeyDeleted { admin_api_key_id: id, name: key.name }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    async fn require_admin(&self, identity: &Identity, workspace_id: WorkspaceId) -> Result<(), ReplaneError> {
        let roles = RoleContext { workspace_role: workspace_role_for(&self.pool, workspace_id, identity).await?, ..Default::default() };
        if !is_allowed(identity, Action::ManageAdminApiKeys, roles) {
            return Err(ReplaneError::forbidden("must be a workspace admin to manage admin API keys"));
        }
        Ok(())
    }
}
