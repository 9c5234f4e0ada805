// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! PermissionService: the authority table from §4.4, expressed as a pure
//! function of an identity, the action being attempted, and whatever role
//! lookups that action needs. Callers (use cases) are responsible for
//! fetching the roles; this module only encodes the decision.

use crate::entities::config::ConfigRole;
use crate::entities::project::ProjectRole;
use crate::entities::workspace::WorkspaceRole;
use crate::identity::{Identity, Scope};

/// An action gated by the authority table. One variant per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadProject,
    ManageProject,
    DeleteProject,
    ManageProjectUsers,
    CreateConfig,
    EditConfigValue,
    ManageConfig,
    ManageEnvironments,
    ManageSdkKeys,
    ManageAdminApiKeys,
    CreateWorkspace,
}

/// The role lookups a decision may need. Callers populate only the fields
/// relevant to the action; irrelevant fields are simply ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleContext {
    pub workspace_role: Option<WorkspaceRole>,
    pub project_role: Option<ProjectRole>,
    pub config_role: Option<ConfigRole>,
    /// `true` if the identity is allowed onto this specific project at
    /// all (workspace membership for users, `Identity::has_project_access`
    /// for API keys). Already resolved by the caller.
    pub project_access: bool,
}

/// Returns `true` if `identity` may perform `action` given `roles`.
pub fn is_allowed(identity: &Identity, action: Action, roles: RoleContext) -> bool {
    if identity.is_superuser() {
        return true;
    }

    match action {
        Action::ReadProject => {
            roles.workspace_role.is_some() || (identity.has_scope(Scope::ProjectRead) && roles.project_access)
        }
        Action::ManageProject => {
            roles.project_role == Some(ProjectRole::Admin)
                || (identity.has_scope(Scope::ProjectWrite) && roles.project_access)
        }
        Action::DeleteProject | Action::ManageProjectUsers => {
            identity.user_id().is_some() && roles.project_role == Some(ProjectRole::Admin)
        }
        Action::CreateConfig => {
            matches!(roles.project_role, Some(ProjectRole::Admin) | Some(ProjectRole::Maintainer))
                || (identity.has_scope(Scope::ConfigWrite) && roles.project_access)
        }
        Action::EditConfigValue => {
            roles.config_role.is_some()
                || roles.project_role == Some(ProjectRole::Admin)
                || (identity.has_scope(Scope::ConfigWrite) && roles.project_access)
        }
        Action::ManageConfig => {
            roles.config_role == Some(ConfigRole::Maintainer)
                || roles.project_role == Some(ProjectRole::Admin)
                || (identity.has_scope(Scope::ConfigWrite) && roles.project_access)
        }
        Action::ManageEnvironments => {
            roles.project_role == Some(ProjectRole::Admin)
                || (identity.has_scope(Scope::EnvironmentWrite) && roles.project_access)
        }
        Action::ManageSdkKeys => {
            roles.project_role == Some(ProjectRole::Admin)
                || (identity.has_scope(Scope::SdkKeyWrite) && roles.project_access)
        }
        Action::ManageAdminApiKeys => identity.user_id().is_some() && roles.workspace_role == Some(WorkspaceRole::Admin),
        Action::CreateWorkspace => identity.user_id().is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AdminApiKeyId, UserId, WorkspaceId};

    fn user() -> Identity {
        Identity::User { id: UserId::new(), email: "a@example.com".into(), name: None }
    }

    fn api_key(scopes: Vec<Scope>) -> Identity {
        Identity::ApiKey { api_key_id: AdminApiKeyId::new(), workspace_id: WorkspaceId::new(), project_ids: None, scopes }
    }

    #[test]
    fn api_keys_cannot_create_workspaces() {
        let id = api_key(vec![]);
        assert!(!is_allowed(&id, Action::CreateWorkspace, RoleContext::default()));
    }

    #[test]
    fn any_user_can_create_workspace() {
        assert!(is_allowed(&user(), Action::CreateWorkspace, RoleContext::default()));
    }

    #[test]
    fn config_write_scope_allows_creating_configs_with_project_access() {
        let id = api_key(vec![Scope::ConfigWrite]);
        let roles = RoleContext { project_access: true, ..Default::default() };
        assert!(is_allowed(&id, Action::CreateConfig, roles));
    }

    #[test]
    fn config_write_scope_without_project_access_is_denied() {
        let id = api_key(vec![Scope::ConfigWrite]);
        let roles = RoleContext { project_access: false, ..Default::default() };
        assert!(!is_allowed(&id, Action::CreateConfig, roles));
    }

    #[test]
    fn api_keys_cannot_manage_admin_api_keys() {
        let id = api_key(vec![Scope::MemberWrite]);
        let roles = RoleContext { workspace_role: Some(WorkspaceRole::Admin), ..Default::default() };
        assert!(!is_allowed(&id, Action::ManageAdminApiKeys, roles));
    }

    #[test]
    fn superuser_bypasses_everything() {
        assert!(is_allowed(&Identity::Superuser, Action::ManageAdminApiKeys, RoleContext::default()));
    }
}
