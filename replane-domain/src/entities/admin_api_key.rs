// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! AdminApiKey: a workspace-scoped programmatic credential used against the
//! management API (distinct from `SdkKey`, which serves runtime config
//! reads). Only the hash is ever persisted; the secret itself is shown to
//! the caller exactly once, at creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AdminApiKeyId, ProjectId, WorkspaceId};
use crate::identity::Scope;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminApiKey {
    pub id: AdminApiKeyId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    /// `None` means every project in the workspace; `Some` restricts the
    /// key to the listed projects (§3, §4.1).
    pub project_ids: Option<Vec<ProjectId>>,
    pub scopes: Vec<Scope>,
    /// Argon2id hash of the full token (§4.2); never logged or returned.
    pub key_hash: String,
    /// First few characters of the token body, stored in the clear so the
    /// UI can distinguish keys without revealing them.
    pub key_prefix: String,
    /// Last four characters of the token body, for the same purpose.
    pub key_suffix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AdminApiKey {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workspace_id: WorkspaceId,
        name: String,
        project_ids: Option<Vec<ProjectId>>,
        scopes: Vec<Scope>,
        key_hash: String,
        key_prefix: String,
        key_suffix: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AdminApiKeyId::new(),
            workspace_id,
            name,
            project_ids,
            scopes,
            key_hash,
            key_prefix,
            key_suffix,
            created_at: now,
            last_used_at: None,
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn revoke(&mut self, now: DateTime<Utc>) {
        self.revoked_at = Some(now);
    }

    pub fn record_use(&mut self, now: DateTime<Utc>) {
        self.last_used_at = Some(now);
    }
}
