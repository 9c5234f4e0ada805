// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Identity Model
//!
//! Tagged union of caller principals. Modeled as a sum type rather than a
//! class hierarchy so the compiler enforces exhaustive handling at every
//! call site that branches on who is calling.

use serde::{Deserialize, Serialize};

use crate::error::ReplaneError;
use crate::ids::{AdminApiKeyId, ProjectId, UserId, WorkspaceId};

/// A single capability an admin API key may hold. Closed set (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    ProjectRead,
    ProjectWrite,
    ConfigRead,
    ConfigWrite,
    EnvironmentRead,
    EnvironmentWrite,
    SdkKeyRead,
    SdkKeyWrite,
    MemberRead,
    MemberWrite,
}

/// The caller of a management operation.
///
/// `User` identities are authenticated humans; `ApiKey` identities are
/// workspace-scoped programmatic callers; `Superuser` is an instance-wide
/// bypass reserved for operational tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User { id: UserId, email: String, name: Option<String> },
    ApiKey { api_key_id: AdminApiKeyId, workspace_id: WorkspaceId, project_ids: Option<Vec<ProjectId>>, scopes: Vec<Scope> },
    Superuser,
}

impl Identity {
    /// Returns `true` if this identity carries the given scope. API keys
    /// with `ProjectWrite` implicitly satisfy `ConfigWrite` reads (§4.4:
    /// "For API keys that are `project:write`-capable, `config:write`
    /// implies read"). Superuser satisfies every scope.
    pub fn has_scope(&self, scope: Scope) -> bool {
        match self {
            Identity::Superuser => true,
            Identity::User { .. } => false,
            Identity::ApiKey { scopes, .. } => {
                scopes.contains(&scope) || (scopes.contains(&Scope::ProjectWrite) && is_read_scope(scope))
            }
        }
    }

    /// Returns `true` if this identity may act on the given project, given
    /// the project's owning workspace.
    pub fn has_project_access(&self, project_id: ProjectId, project_workspace_id: WorkspaceId) -> bool {
        match self {
            Identity::Superuser => true,
            Identity::User { .. } => true, // workspace/project membership is checked separately
            Identity::ApiKey { workspace_id, project_ids, .. } => {
                *workspace_id == project_workspace_id
                    && project_ids.as_ref().map(|ids| ids.contains(&project_id)).unwrap_or(true)
            }
        }
    }

    pub fn is_api_key(&self) -> bool {
        matches!(self, Identity::ApiKey { .. })
    }

    pub fn is_superuser(&self) -> bool {
        matches!(self, Identity::Superuser)
    }

    /// Normalizes to the caller's email, failing with `Forbidden` for
    /// operations that require a human (workspace creation, account
    /// deletion, project-user role changes, some restores — §4.1).
    pub fn require_user(&self) -> Result<&str, ReplaneError> {
        match self {
            Identity::User { email, .. } => Ok(email.as_str()),
            Identity::ApiKey { .. } => {
                Err(ReplaneError::forbidden("this operation requires a user identity, not an API key"))
            }
            Identity::Superuser => Ok("superuser"),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::User { id, .. } => Some(*id),
            _ => None,
        }
    }
}

fn is_read_scope(scope: Scope) -> bool {
    matches!(
        scope,
        Scope::ProjectRead | Scope::ConfigRead | Scope::EnvironmentRead | Scope::SdkKeyRead | Scope::MemberRead
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws() -> WorkspaceId {
        WorkspaceId::new()
    }

    #[test]
    fn superuser_has_every_scope_and_access() {
        let id = Identity::Superuser;
        assert!(id.has_scope(Scope::ConfigWrite));
        assert!(id.has_project_access(ProjectId::new(), ws()));
    }

    #[test]
    fn api_key_with_null_project_ids_has_access_to_any_project_in_workspace() {
        let workspace_id = ws();
        let id = Identity::ApiKey {
            api_key_id: AdminApiKeyId::new(),
            workspace_id,
            project_ids: None,
            scopes: vec![Scope::ConfigWrite],
        };
        assert!(id.has_project_access(ProjectId::new(), workspace_id));
        assert!(!id.has_project_access(ProjectId::new(), ws()));
    }

    #[test]
    fn api_key_with_project_write_implies_config_read() {
        let id = Identity::ApiKey {
            api_key_id: AdminApiKeyId::new(),
            workspace_id: ws(),
            project_ids: None,
            scopes: vec![Scope::ProjectWrite],
        };
        assert!(id.has_scope(Scope::ConfigRead));
        assert!(!id.has_scope(Scope::ConfigWrite));
    }

    #[test]
    fn require_user_rejects_api_keys() {
        let id = Identity::ApiKey {
            api_key_id: AdminApiKeyId::new(),
            workspace_id: ws(),
            project_ids: None,
            scopes: vec![],
        };
        assert!(id.require_user().is_err());
    }
}
