// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Proposal use cases: the reviewed-edit path for projects and
//! environments with `require_proposals` enabled. Creating a proposal
//! only needs editor-level authority; resolving one is gated by what the
//! proposal actually changes — a plain value/override edit needs only
//! editor authority, while a delete or schema change needs a maintainer
//! (§4.4, §4.7), further narrowed by `allow_self_approvals`.

use serde_json::Value;
use sqlx::SqlitePool;

use replane_domain::entities::proposal::{ConfigProposal, VariantProposalTarget};
use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::{ConfigId, ConfigProposalId, ConfigVariantId};
use replane_domain::services::permission_service::{is_allowed, Action, RoleContext};
use replane_domain::value_objects::override_rule::Override;

use crate::application::services::proposal_service::ProposalService;
use crate::application::use_cases::roles::{config_role_for, project_access_for, project_role_for, require_project};
use crate::infrastructure::stores::{config_proposals, config_variants, configs};

pub struct ProposalUseCases {
    pool: SqlitePool,
    proposal_service: ProposalService,
}

impl ProposalUseCases {
    pub fn new(pool: SqlitePool) -> Self {
        let proposal_service = ProposalService::new(pool.clone());
        Self { pool, proposal_service }
    }

    /// Creates a proposal. `variant_target_ids` is empty to target the
    /// config's default variant, or names one or more environment
    /// variants to propose the same change against each at once;
    /// `is_delete` proposes deleting the target(s) rather than changing
    /// their value (§4.6, §4.7).
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        identity: &Identity,
        config_id: ConfigId,
        variant_target_ids: Vec<ConfigVariantId>,
        is_delete: bool,
        proposed_value: Value,
        proposed_schema: Option<Value>,
        proposed_use_base_schema: bool,
        proposed_overrides: Vec<Override>,
    ) -> Result<ConfigProposal, ReplaneError> {
        let cfg = configs::get_by_id(&self.pool, config_id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, config_id).await?;
        if !is_allowed(identity, Action::EditConfigValue, roles) {
            return Err(ReplaneError::forbidden("cannot propose changes to this config"));
        }

        let mut variant_targets = Vec::with_capacity(variant_target_ids.len());
        for variant_id in variant_target_ids {
            let variant = config_variants::get_by_id(&self.pool, variant_id)
                .await?
                .ok_or_else(|| ReplaneError::not_found("no such config variant"))?;
            if variant.config_id != config_id {
                return Err(ReplaneError::bad_request("variant does not belong to this config"));
            }
            variant_targets.push(VariantProposalTarget {
                config_variant_id: variant.id,
                environment_id: variant.environment_id,
                base_version: variant.version,
            });
        }
        let base_version = cfg.version;

        let actor = identity.user_id().unwrap_or_default();
        self.proposal_service
            .create_proposal(
                config_id,
                project.id,
                variant_targets,
                is_delete,
                proposed_value,
                proposed_schema,
                proposed_use_base_schema,
                proposed_overrides,
                base_version,
                actor,
            )
            .await
    }

    pub async fn get(&self, id: ConfigProposalId) -> Result<ConfigProposal, ReplaneError> {
        config_proposals::get_by_id(&self.pool, id).await?.ok_or_else(|| ReplaneError::not_found("no such proposal"))
    }

    pub async fn list_pending_by_config(&self, config_id: ConfigId) -> Result<Vec<ConfigProposal>, ReplaneError> {
        config_proposals::list_pending_by_config(&self.pool, config_id).await
    }

    pub async fn list_by_config(&self, config_id: ConfigId) -> Result<Vec<ConfigProposal>, ReplaneError> {
        config_proposals::list_by_config(&self.pool, config_id).await
    }

    /// Approves a pending proposal. The authority required depends on
    /// what the proposal changes: a value/override-only edit needs only
    /// config-editor authority, while a delete or schema change needs a
    /// maintainer (`ConfigProposal::required_action`). A proposal's own
    /// author may only approve it when the project allows self-approval
    /// (§4.4, §4.7).
    pub async fn approve(&self, identity: &Identity, id: ConfigProposalId) -> Result<ConfigProposal, ReplaneError> {
        let p = self.get(id).await?;
        let cfg = configs::get_by_id(&self.pool, p.config_id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, cfg.id).await?;
        if !is_allowed(identity, p.required_action(), roles) {
            return Err(ReplaneError::forbidden("insufficient authority to resolve this proposal"));
        }
        if identity.user_id() == Some(p.created_by) && !project.allow_self_approvals {
            return Err(ReplaneError::forbidden("this project does not allow approving your own proposals"));
        }

        let resolver = identity.user_id().ok_or_else(|| ReplaneError::forbidden("only a user may resolve a proposal"))?;
        self.proposal_service.approve(p, project.id, resolver).await
    }

    pub async fn reject(&self, identity: &Identity, id: ConfigProposalId) -> Result<ConfigProposal, ReplaneError> {
        let p = self.get(id).await?;
        let cfg = configs::get_by_id(&self.pool, p.config_id).await?.ok_or_else(|| ReplaneError::not_found("no such config"))?;
        let project = require_project(&self.pool, cfg.project_id).await?;
        let roles = self.config_roles(identity, &project, cfg.id).await?;
        if !is_allowed(identity, p.required_action(), roles) {
            return Err(ReplaneError::forbidden("insufficient authority to resolve this proposal"));
        }

        let resolver = identity.user_id().ok_or_else(|| ReplaneError::forbidden("only a user may resolve a proposal"))?;
        self.proposal_service.reject(p, project.id, resolver).await
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
