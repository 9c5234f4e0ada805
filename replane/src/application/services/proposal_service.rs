// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! ProposalService: create/approve/reject transitions for config proposals,
//! used by projects and environments with `require_proposals` enabled
//! (§3, §4.4, §4.7).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::proposal::{ConfigProposal, RejectionReason, VariantProposalTarget};
use replane_domain::error::ReplaneError;
use replane_domain::ids::{ConfigId, ProjectId, UserId};
use replane_domain::services::json_schema;
use replane_domain::value_objects::override_rule::Override;

use crate::application::services::config_service::{apply_config_delete, apply_config_update, apply_variant_delete, apply_variant_update, reject_pending_proposals};
use crate::infrastructure::stores::{audit_logs, config_proposals, config_variants, configs};

pub struct ProposalService {
    pool: SqlitePool,
}

impl ProposalService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_proposal(
        &self,
        config_id: ConfigId,
        project_id: ProjectId,
        variant_targets: Vec<VariantProposalTarget>,
        is_delete: bool,
        proposed_value: Value,
        proposed_schema: Option<Value>,
        proposed_use_base_schema: bool,
        proposed_overrides: Vec<Override>,
        base_version: u64,
        actor: UserId,
    ) -> Result<ConfigProposal, ReplaneError> {
        let now = Utc::now();
        let proposal = ConfigProposal::new(
            config_id,
            variant_targets,
            is_delete,
            proposed_value,
            proposed_schema,
            proposed_use_base_schema,
            proposed_overrides,
            base_version,
            actor,
            now,
        );

        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        config_proposals::create(&mut *tx, &proposal).await?;

        if proposal.targets_default() {
            let payload = AuditPayload::ConfigProposalCreated { config_proposal_id: proposal.id, config_id };
            audit_logs::create(&mut *tx, &AuditLog::new(Some(actor), Some(project_id), Some(config_id), payload, now)).await?;
        } else {
            for target in &proposal.variant_targets {
                let payload = AuditPayload::ConfigVariantProposalCreated {
                    config_proposal_id: proposal.id,
                    config_variant_id: target.config_variant_id,
                };
                audit_logs::create(&mut *tx, &AuditLog::new(Some(actor), Some(project_id), Some(config_id), payload, now)).await?;
            }
        }
        tx.commit().await.map_err(map_tx_err)?;

        Ok(proposal)
    }

    /// Approves a pending proposal: marks it approved and applies every
    /// target's change in the same transaction, so a failure partway
    /// through (a stale version, a missing target) rolls the whole thing
    /// back and leaves the proposal `pending` rather than stranding it
    /// approved against an unapplied edit (§3).
    pub async fn approve(
        &self,
        mut proposal: ConfigProposal,
        project_id: ProjectId,
        resolver: UserId,
    ) -> Result<ConfigProposal, ReplaneError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;

        proposal.approve(resolver, now)?;
        config_proposals::update_status(&mut *tx, &proposal).await?;

        if proposal.targets_default() {
            let config = configs::get_by_id(&mut *tx, proposal.config_id)
                .await?
                .ok_or_else(|| ReplaneError::not_found("config no longer exists"))?;
            if proposal.is_delete {
                apply_config_delete(&mut tx, config, project_id, resolver, now).await?;
            } else {
                json_schema::validate_optional(proposal.proposed_schema.as_ref(), &proposal.proposed_value)?;
                apply_config_update(
                    &mut tx,
                    config,
                    project_id,
                    proposal.base_version,
                    proposal.proposed_value.clone(),
                    proposal.proposed_schema.clone(),
                    proposal.proposed_overrides.clone(),
                    resolver,
                    now,
                )
                .await?;
            }
        } else {
            for target in &proposal.variant_targets {
                apply_variant_target(&mut tx, &proposal, target, project_id, resolver, now).await?;
            }
        }

        reject_pending_proposals(&mut tx, proposal.config_id, resolver, now, Some(proposal.id)).await?;

        let payload = approval_payload(&proposal);
        for p in payload {
            audit_logs::create(&mut *tx, &AuditLog::new(Some(resolver), Some(project_id), Some(proposal.config_id), p, now)).await?;
        }

        tx.commit().await.map_err(map_tx_err)?;
        Ok(proposal)
    }

    pub async fn reject(
        &self,
        mut proposal: ConfigProposal,
        project_id: ProjectId,
        resolver: UserId,
    ) -> Result<ConfigProposal, ReplaneError> {
        let now = Utc::now();
        proposal.reject(RejectionReason::Maintainer, resolver, now)?;
        config_proposals::update_status(&self.pool, &proposal).await?;

        for payload in rejection_payload(&proposal) {
            audit_logs::create(&self.pool, &AuditLog::new(Some(resolver), Some(project_id), Some(proposal.config_id), payload, now)).await?;
        }

        Ok(proposal)
    }
}

async fn apply_variant_target(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    proposal: &ConfigProposal,
    target: &VariantProposalTarget,
    project_id: ProjectId,
    resolver: UserId,
    now: DateTime<Utc>,
) -> Result<(), ReplaneError> {
    let variant = config_variants::get_by_id(&mut **tx, target.config_variant_id)
        .await?
        .ok_or_else(|| ReplaneError::not_found("variant no longer exists"))?;

    if proposal.is_delete {
        apply_variant_delete(tx, variant, project_id, resolver, now).await?;
        return Ok(());
    }

    let base_config = configs::get_by_id(&mut **tx, variant.config_id).await?;
    json_schema::validate_optional(proposal.proposed_schema.as_ref(), &proposal.proposed_value)?;
    if proposal.proposed_use_base_schema || proposal.proposed_schema.is_none() {
        json_schema::validate_optional(base_config.as_ref().and_then(|c| c.schema.as_ref()), &proposal.proposed_value)?;
    }

    apply_variant_update(
        tx,
        variant,
        project_id,
        target.base_version,
        proposal.proposed_value.clone(),
        proposal.proposed_schema.clone(),
        proposal.proposed_use_base_schema,
        proposal.proposed_overrides.clone(),
        resolver,
        now,
    )
    .await?;
    Ok(())
}

fn approval_payload(proposal: &ConfigProposal) -> Vec<AuditPayload> {
    if proposal.targets_default() {
        vec![AuditPayload::ConfigProposalApproved { config_proposal_id: proposal.id, config_id: proposal.config_id }]
    } else {
        proposal
            .variant_targets
            .iter()
            .map(|t| AuditPayload::ConfigVariantProposalApproved { config_proposal_id: proposal.id, config_variant_id: t.config_variant_id })
            .collect()
    }
}

fn rejection_payload(proposal: &ConfigProposal) -> Vec<AuditPayload> {
    if proposal.targets_default() {
        vec![AuditPayload::ConfigProposalRejected { config_proposal_id: proposal.id, config_id: proposal.config_id }]
    } else {
        proposal
            .variant_targets
            .iter()
            .map(|t| AuditPayload::ConfigVariantProposalRejected { config_proposal_id: proposal.id, config_variant_id: t.config_variant_id })
            .collect()
    }
}

fn map_tx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}
