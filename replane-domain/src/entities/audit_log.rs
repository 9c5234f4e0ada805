// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! AuditLog: an append-only record of every mutation. Never updated or
//! deleted after creation; ordered by `(created_at desc, id desc)` with
//! keyset pagination since ids are time-ordered UUIDv7 values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{
    AdminApiKeyId, AuditLogId, ConfigId, ConfigProposalId, ConfigVariantId, EnvironmentId,
    ProjectId, SdkKeyId, UserId, WorkspaceId,
};

/// Closed set of audit payload shapes. One variant per entry in the
/// `type` enumeration; each carries whatever identifiers and snapshot
/// data that event needs to be independently meaningful in a history
/// view, without joining back to (possibly since-deleted) live rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditPayload {
    ConfigCreated { config_id: ConfigId, key: String },
    ConfigUpdated { config_id: ConfigId, from_version: u64, to_version: u64 },
    ConfigDeleted { config_id: ConfigId, key: String, snapshot: serde_json::Value },
    ConfigVersionRestored { config_id: ConfigId, restored_version: u64, new_version: u64 },
    ConfigVariantCreated { config_variant_id: ConfigVariantId, environment_id: EnvironmentId },
    ConfigVariantUpdated { config_variant_id: ConfigVariantId, environment_id: EnvironmentId, from_version: u64, to_version: u64 },
    ConfigVariantVersionRestored { config_variant_id: ConfigVariantId, restored_version: u64, new_version: u64 },
    ConfigVariantDeleted { config_variant_id: ConfigVariantId, environment_id: EnvironmentId },
    SdkKeyCreated { sdk_key_id: SdkKeyId, environment_id: EnvironmentId, name: String },
    SdkKeyDeleted { sdk_key_id: SdkKeyId, name: String },
    SdkKeyUpdated { sdk_key_id: SdkKeyId, name: String },
    AdminApiKeyCreated { admin_api_key_id: AdminApiKeyId, name: String },
    AdminApiKeyDeleted { admin_api_key_id: AdminApiKeyId, name: String },
    ConfigMembersChanged { config_id: ConfigId },
    ProjectCreated { project_id: ProjectId, name: String },
    ProjectUpdated { project_id: ProjectId },
    ProjectDeleted { project_id: ProjectId, name: String },
    ProjectMembersChanged { project_id: ProjectId },
    EnvironmentCreated { environment_id: EnvironmentId, name: String },
    EnvironmentDeleted { environment_id: EnvironmentId, name: String },
    ConfigProposalCreated { config_proposal_id: ConfigProposalId, config_id: ConfigId },
    ConfigProposalApproved { config_proposal_id: ConfigProposalId, config_id: ConfigId },
    ConfigProposalRejected { config_proposal_id: ConfigProposalId, config_id: ConfigId },
    ConfigVariantProposalCreated { config_proposal_id: ConfigProposalId, config_variant_id: ConfigVariantId },
    ConfigVariantProposalApproved { config_proposal_id: ConfigProposalId, config_variant_id: ConfigVariantId },
    ConfigVariantProposalRejected { config_proposal_id: ConfigProposalId, config_variant_id: ConfigVariantId },
    WorkspaceCreated { workspace_id: WorkspaceId, name: String },
    WorkspaceUpdated { workspace_id: WorkspaceId },
    WorkspaceDeleted { workspace_id: WorkspaceId, name: String },
    WorkspaceMemberAdded { workspace_id: WorkspaceId, email: String },
    WorkspaceMemberRemoved { workspace_id: WorkspaceId, email: String },
    WorkspaceMemberRoleChanged { workspace_id: WorkspaceId, email: String },
    UserAccountDeleted { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
    pub config_id: Option<ConfigId>,
    pub payload: AuditPayload,
}

impl AuditLog {
    pub fn new(
        user_id: Option<UserId>,
        project_id: Option<ProjectId>,
        config_id: Option<ConfigId>,
        payload: AuditPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self { id: AuditLogId::new(), created_at: now, user_id, project_id, config_id, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_tagged_type_field() {
        let log = AuditLog::new(
            Some(UserId::new()),
            None,
            None,
            AuditPayload::WorkspaceCreated { workspace_id: WorkspaceId::new(), name: "Acme".into() },
            Utc::now(),
        );
        let v = serde_json::to_value(&log.payload).unwrap();
        assert_eq!(v["type"], "workspace_created");
    }
}
