// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end exercises of the composition root: a transport layer would
//! dispatch into these same use cases, so these tests drive `AppState`
//! directly instead of mocking anything underneath it.

use serde_json::json;

use replane::infrastructure::config::RuntimeConfig;
use replane::infrastructure::repositories::schema::initialize_database;
use replane::AppState;
use replane_domain::entities::config::ConfigRole;
use replane_domain::entities::project::ProjectRole;
use replane_domain::entities::proposal::ProposalStatus;
use replane_domain::entities::workspace::WorkspaceRole;
use replane_domain::error::ReplaneError;
use replane_domain::identity::{Identity, Scope};
use replane_domain::ids::UserId;

async fn test_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = initialize_database(&db_url).await.unwrap();
    let config = RuntimeConfig { persistence_url: db_url, ..RuntimeConfig::default() };
    (dir, AppState::new(pool, config))
}

fn user(email: &str) -> Identity {
    Identity::User { id: UserId::new(), email: email.to_string(), name: None }
}

fn bool_schema() -> serde_json::Value {
    json!({"type": "object", "required": ["enabled"], "properties": {"enabled": {"type": "boolean"}}})
}

#[tokio::test]
async fn workspace_to_config_direct_edit_bumps_version() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");

    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state
        .projects
        .create(&owner, workspace.id, "web".into(), None, false, true)
        .await
        .unwrap();

    let config = state
        .configs
        .create(
            &owner,
            project.id,
            "feature.enabled".into(),
            "Feature flag".into(),
            None,
            json!({"enabled": false}),
            Some(bool_schema()),
        )
        .await
        .unwrap();
    assert_eq!(config.version, 1);

    let updated = state
        .configs
        .update(&owner, config.id, config.version, json!({"enabled": true}), Some(bool_schema()), Vec::new())
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.value, json!({"enabled": true}));
}

#[tokio::test]
async fn create_and_update_reject_values_that_violate_schema() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();

    let bad_create = state
        .configs
        .create(&owner, project.id, "feature.enabled".into(), "Feature flag".into(), None, json!({"enabled": "nope"}), Some(bool_schema()))
        .await;
    assert!(matches!(bad_create, Err(ReplaneError::BadRequest { .. })));

    let config = state
        .configs
        .create(&owner, project.id, "feature.enabled".into(), "Feature flag".into(), None, json!({"enabled": false}), Some(bool_schema()))
        .await
        .unwrap();

    let bad_update = state.configs.update(&owner, config.id, config.version, json!({"enabled": 1}), Some(bool_schema()), Vec::new()).await;
    assert!(matches!(bad_update, Err(ReplaneError::BadRequest { .. })));
}

#[tokio::test]
async fn require_proposals_redirects_editor_to_approval_required_and_proposal_flow_succeeds() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let editor = user("editor@example.com");

    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state
        .projects
        .create(&owner, workspace.id, "web".into(), None, true, true)
        .await
        .unwrap();
    // A project member's account must be a workspace member too for project
    // access resolution to find them, so add the editor to the workspace.
    state
        .workspaces
        .upsert_member(&owner, workspace.id, "editor@example.com".into(), WorkspaceRole::Member)
        .await
        .unwrap();

    let config = state
        .configs
        .create(&owner, project.id, "feature.enabled".into(), "Feature flag".into(), None, json!({"enabled": false}), None)
        .await
        .unwrap();
    state.configs.upsert_user(&owner, config.id, "editor@example.com".into(), ConfigRole::Editor).await.unwrap();

    let redirected = state.configs.update(&editor, config.id, config.version, json!({"enabled": true}), None, Vec::new()).await;
    match redirected {
        Err(ReplaneError::BadRequest { code: Some("APPROVAL_REQUIRED"), .. }) => {}
        other => panic!("expected APPROVAL_REQUIRED, got {other:?}"),
    }

    let proposal = state
        .proposals
        .create(&editor, config.id, Vec::new(), false, json!({"enabled": true}), None, true, Vec::new())
        .await
        .unwrap();
    assert_eq!(proposal.status, ProposalStatus::Pending);

    // The editor cannot approve their own work; only a maintainer can.
    let self_approve = state.proposals.approve(&editor, proposal.id).await;
    assert!(self_approve.is_err());

    let approved = state.proposals.approve(&owner, proposal.id).await.unwrap();
    assert_eq!(approved.status, ProposalStatus::Approved);

    let config = state.configs.get(config.id).await.unwrap();
    assert_eq!(config.version, 2);
    assert_eq!(config.value, json!({"enabled": true}));
}

#[tokio::test]
async fn self_approval_is_forbidden_unless_the_project_allows_it() {
    let (_dir, state) = test_state().await;
    let maintainer = user("maintainer@example.com");

    let workspace = state.workspaces.create(&maintainer, "acme".into(), true).await.unwrap();
    let strict_project = state
        .projects
        .create(&maintainer, workspace.id, "strict".into(), None, true, false)
        .await
        .unwrap();
    let lenient_project = state
        .projects
        .create(&maintainer, workspace.id, "lenient".into(), None, true, true)
        .await
        .unwrap();

    let strict_config = state
        .configs
        .create(&maintainer, strict_project.id, "flag".into(), "Flag".into(), None, json!({"on": false}), None)
        .await
        .unwrap();
    let lenient_config = state
        .configs
        .create(&maintainer, lenient_project.id, "flag".into(), "Flag".into(), None, json!({"on": false}), None)
        .await
        .unwrap();

    let strict_proposal = state.proposals.create(&maintainer, strict_config.id, Vec::new(), false, json!({"on": true}), None, true, Vec::new()).await.unwrap();
    let denied = state.proposals.approve(&maintainer, strict_proposal.id).await;
    assert!(matches!(denied, Err(ReplaneError::Forbidden(_))));

    let lenient_proposal = state.proposals.create(&maintainer, lenient_config.id, Vec::new(), false, json!({"on": true}), None, true, Vec::new()).await.unwrap();
    let approved = state.proposals.approve(&maintainer, lenient_proposal.id).await.unwrap();
    assert_eq!(approved.status, ProposalStatus::Approved);
}

#[tokio::test]
async fn approving_a_proposal_superseded_by_another_approval_fails_with_version_mismatch() {
    let (_dir, state) = test_state().await;
    let maintainer = user("maintainer@example.com");

    let workspace = state.workspaces.create(&maintainer, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&maintainer, workspace.id, "web".into(), None, true, true).await.unwrap();
    let config = state
        .configs
        .create(&maintainer, project.id, "flag".into(), "Flag".into(), None, json!({"on": false}), None)
        .await
        .unwrap();

    let first = state.proposals.create(&maintainer, config.id, Vec::new(), false, json!({"on": true}), None, true, Vec::new()).await.unwrap();
    let second = state.proposals.create(&maintainer, config.id, Vec::new(), false, json!({"on": false}), None, true, Vec::new()).await.unwrap();

    state.proposals.approve(&maintainer, first.id).await.unwrap();

    // Approving first's edit bulk-rejected every other proposal pending
    // against this config, including `second` — but the use case still
    // re-checks the live config's version before honoring a resolution,
    // so this surfaces as a version mismatch rather than silently no-oping.
    let stale = state.proposals.approve(&maintainer, second.id).await;
    match stale {
        Err(ReplaneError::BadRequest { code: Some("CONFIG_VERSION_MISMATCH"), .. }) => {}
        other => panic!("expected CONFIG_VERSION_MISMATCH, got {other:?}"),
    }
}

#[tokio::test]
async fn admin_api_key_with_config_write_scope_can_create_configs_in_its_workspace() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();

    let created = state
        .admin_api_keys
        .create(&owner, workspace.id, "ci-bot".into(), None, vec![Scope::ConfigWrite])
        .await
        .unwrap();
    assert!(created.token.starts_with("rpa_"));

    let api_identity = Identity::ApiKey {
        api_key_id: created.key.id,
        workspace_id: workspace.id,
        project_ids: None,
        scopes: vec![Scope::ConfigWrite],
    };

    let config = state
        .configs
        .create(&api_identity, project.id, "flag".into(), "Flag".into(), None, json!({"on": false}), None)
        .await
        .unwrap();
    assert_eq!(config.key, "flag");

    // Revoking it is a workspace-admin-only operation the key itself cannot perform.
    let self_revoke = state.admin_api_keys.revoke(&api_identity, created.key.id).await;
    assert!(self_revoke.is_err());
}

#[tokio::test]
async fn sdk_key_verifies_reads_until_revoked_and_revoke_takes_effect_immediately() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();
    let env = state.environments.create(&owner, project.id, "production".into(), 0, false).await.unwrap();
    state
        .configs
        .create(&owner, project.id, "flag".into(), "Flag".into(), None, json!({"on": true}), None)
        .await
        .unwrap();

    let created = state.sdk_keys.create(&owner, env.id, "prod-sdk".into()).await.unwrap();

    let resolved = state.replicas.get_configs(&created.token).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].key, "flag");
    assert_eq!(resolved[0].value, json!({"on": true}));

    // Same token again should hit the verifier's cache and still succeed.
    state.replicas.get_configs(&created.token).await.unwrap();

    state.sdk_keys.revoke(&owner, created.key.id).await.unwrap();

    let after_revoke = state.replicas.get_configs(&created.token).await;
    assert!(matches!(after_revoke, Err(ReplaneError::Forbidden(_))), "revoked key must fail immediately, not after cache TTL");
}

#[tokio::test]
async fn environment_cannot_delete_a_projects_last_environment() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();
    let env = state.environments.create(&owner, project.id, "production".into(), 0, false).await.unwrap();

    let result = state.environments.delete(&owner, env.id).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn project_user_management_refuses_to_remove_the_last_admin() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();

    let removed = state.projects.remove_user(&owner, project.id, "owner@example.com".into()).await;
    assert!(removed.is_err());

    state
        .projects
        .upsert_user(&owner, project.id, "second-admin@example.com".into(), ProjectRole::Admin)
        .await
        .unwrap();
    state.projects.remove_user(&owner, project.id, "owner@example.com".into()).await.unwrap();
}

#[tokio::test]
async fn workspace_cannot_delete_its_last_project() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();

    let result = state.projects.delete(&owner, project.id).await;
    assert!(result.is_err());

    let other = state.projects.create(&owner, workspace.id, "mobile".into(), None, false, true).await.unwrap();
    state.projects.delete(&owner, project.id).await.unwrap();
    assert_eq!(state.projects.list_by_workspace(workspace.id).await.unwrap(), vec![other]);
}

#[tokio::test]
async fn direct_edit_with_stale_expected_version_is_rejected() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();
    let config = state
        .configs
        .create(&owner, project.id, "flag".into(), "Flag".into(), None, json!({"on": false}), None)
        .await
        .unwrap();

    state.configs.update(&owner, config.id, config.version, json!({"on": true}), None, Vec::new()).await.unwrap();

    // `config.version` is now stale: the live row moved to version 2.
    let stale = state.configs.update(&owner, config.id, config.version, json!({"on": false}), None, Vec::new()).await;
    match stale {
        Err(ReplaneError::BadRequest { code: Some("CONFIG_VERSION_MISMATCH"), .. }) => {}
        other => panic!("expected CONFIG_VERSION_MISMATCH, got {other:?}"),
    }
}

#[tokio::test]
async fn admin_api_key_token_authenticates_to_the_same_identity_it_was_created_with() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();

    let created = state
        .admin_api_keys
        .create(&owner, workspace.id, "ci-bot".into(), None, vec![Scope::ConfigWrite])
        .await
        .unwrap();

    let identity = state.authenticate_admin_key(&created.token).await.unwrap();
    match identity {
        Identity::ApiKey { api_key_id, workspace_id, .. } => {
            assert_eq!(api_key_id, created.key.id);
            assert_eq!(workspace_id, workspace.id);
        }
        other => panic!("expected an API key identity, got {other:?}"),
    }

    // Cached lookups must still succeed.
    state.authenticate_admin_key(&created.token).await.unwrap();

    state.admin_api_keys.revoke(&owner, created.key.id).await.unwrap();
    let after_revoke = state.authenticate_admin_key(&created.token).await;
    assert!(after_revoke.is_err(), "a revoked key must fail immediately, not after cache TTL");
}

#[tokio::test]
async fn replica_read_path_serves_overrides_unevaluated_for_client_side_resolution() {
    let (_dir, state) = test_state().await;
    let owner = user("owner@example.com");
    let workspace = state.workspaces.create(&owner, "acme".into(), true).await.unwrap();
    let project = state.projects.create(&owner, workspace.id, "web".into(), None, false, true).await.unwrap();
    let env = state.environments.create(&owner, project.id, "production".into(), 0, false).await.unwrap();
    let config = state
        .configs
        .create(&owner, project.id, "flag".into(), "Flag".into(), None, json!({"on": false}), None)
        .await
        .unwrap();

    let overrides = vec![replane_domain::value_objects::override_rule::Override {
        name: "beta-users".into(),
        conditions: vec![replane_domain::value_objects::override_rule::Condition::Equals {
            property: "tier".into(),
            value: replane_domain::value_objects::override_rule::ValueRef::Literal { value: json!("beta") },
        }],
        value: json!({"on": true}),
    }];
    state.configs.update(&owner, config.id, config.version, json!({"on": false}), None, overrides.clone()).await.unwrap();

    let created = state.sdk_keys.create(&owner, env.id, "prod-sdk".into()).await.unwrap();
    let resolved = state.replicas.get_configs(&created.token).await.unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].value, json!({"on": false}));
    assert_eq!(resolved[0].overrides, overrides);
}
