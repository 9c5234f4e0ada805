// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Workspace management use cases: creation is open to any authenticated
//! user (§4.1); every other mutation requires the caller to already hold
//! the workspace `admin` role, checked directly rather than through
//! `permission_service` since workspace administration sits above the
//! project/config authority table it encodes.

use chrono::Utc;
use sqlx::SqlitePool;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::workspace::{self, Workspace, WorkspaceMember, WorkspaceRole};
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::WorkspaceId;
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};

use crate::application::use_cases::roles::workspace_role_for;
use crate::infrastructure::stores::{audit_logs, workspaces};

pub struct WorkspaceUseCases {
    pool: SqlitePool,
}

impl WorkspaceUseCases {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, identity: &Identity, name: String, auto_add_new_users: bool) -> Result<Workspace, ReplaneError> {
        if !is_allowed(identity, Action::CreateWorkspace, RoleContext::default()) {
            return Err(ReplaneError::forbidden("only authenticated users may create workspaces"));
        }
        let creator = identity.require_user()?;
        let now = Utc::now();
        let ws = Workspace::new(name.clone(), auto_add_new_users, now);

        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        workspaces::create(&mut *tx, &ws).await?;
        workspaces::upsert_member(&mut *tx, ws.id, &WorkspaceMember { email: creator.to_string(), role: WorkspaceRole::Admin }).await?;
        audit_logs::create(
            &mut *tx,
            &AuditLog::new(identity.user_id(), None, None, AuditPayload::WorkspaceCreated { workspace_id: ws.id, name }, now),
        )
        .await?;
        tx.commit().await.map_err(map_tx_err)?;

        Ok(ws)
    }

    pub async fn get(&self, id: WorkspaceId) -> Result<Workspace, ReplaneError> {
        workspaces::get_by_id(&self.pool, id).await?.ok_or_else(|| ReplaneError::not_found("no such workspace"))
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: WorkspaceId,
        name: Option<String>,
        auto_add_new_users: Option<bool>,
    ) -> Result<Workspace, ReplaneError> {
        let mut ws = self.get(id).await?;
        self.require_admin(identity, id).await?;

        if let Some(name) = name {
            ws.name = name;
        }
        if let Some(flag) = auto_add_new_users {
            ws.auto_add_new_users = flag;
        }
        ws.updated_at = Utc::now();

        workspaces::update(&self.pool, &ws).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), None, None, AuditPayload::WorkspaceUpdated { workspace_id: ws.id }, ws.updated_at),
        )
        .await?;
        Ok(ws)
    }

    pub async fn delete(&self, identity: &Identity, id: WorkspaceId) -> Result<(), ReplaneError> {
        let ws = self.get(id).await?;
        self.require_admin(identity, id).await?;

        workspaces::delete(&self.pool, id).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), None, None, AuditPayload::WorkspaceDeleted { workspace_id: id, name: ws.name }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    pub async fn list_members(&self, id: WorkspaceId) -> Result<Vec<WorkspaceMember>, ReplaneError> {
        workspaces::list_members(&self.pool, id).await
    }

    pub async fn upsert_member(
        &self,
        identity: &Identity,
        id: WorkspaceId,
        email: String,
        role: WorkspaceRole,
    ) -> Result<(), ReplaneError> {
        self.require_admin(identity, id).await?;

        let mut members = workspaces::list_members(&self.pool, id).await?;
        let is_new_member = !members.iter().any(|m| m.email == email);
        members.retain(|m| m.email != email);
        members.push(WorkspaceMember { email: email.clone(), role });
        workspace::ensure_has_admin(&members)?;

        workspaces::upsert_member(&self.pool, id, &WorkspaceMember { email: email.clone(), role }).await?;
        let payload = if is_new_member {
            AuditPayload::WorkspaceMemberAdded { workspace_id: id, email }
        } else {
            AuditPayload::WorkspaceMemberRoleChanged { workspace_id: id, email }
        };
        audit_logs::create(&self.pool, &AuditLog::new(identity.user_id(), None, None, payload, Utc::now())).await?;
        Ok(())
    }

    pub async fn remove_member(&self, identity: &Identity, id: WorkspaceId, email: String) -> Result<(), ReplaneError> {
        self.require_admin(identity, id).await?;

        let members = workspaces::list_members(&self.pool, id).await?;
        let remaining: Vec<_> = members.into_iter().filter(|m| m.email != email).collect();
        workspace::ensure_has_admin(&remaining)?;

        workspaces::remove_member(&self.pool, id, &email).await?;
        audit_logs::create(
            &self.pool,
            &AuditLog::new(identity.user_id(), None, None, AuditPayload::WorkspaceMemberRemoved { workspace_id: id, email }, Utc::now()),
        )
        .await?;
        Ok(())
    }

    async fn require_admin(&self, identity: &Identity, workspace_id: WorkspaceId) -> Result<(), ReplaneError> {
        if identity.is_superuser() {
            return Ok(());
        }
        match workspace_role_for(&self.pool, workspace_id, identity).await? {
            Some(WorkspaceRole::Admin) => Ok(()),
            _ => Err(ReplaneError::forbidden("this operation requires workspace admin")),
        }
    }
}

fn map_tx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}
