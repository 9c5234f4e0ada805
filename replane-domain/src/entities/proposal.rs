// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! ConfigProposal: a pending edit awaiting maintainer approval in projects
//! (or environments) with `require_proposals` enabled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReplaneError;
use crate::ids::{ConfigId, ConfigProposalId, ConfigVariantId, EnvironmentId, UserId};
use crate::services::permission_service::Action;
use crate::value_objects::override_rule::Override;

/// Reason a proposal left the `Pending` state without a maintainer acting
/// on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// A maintainer explicitly rejected it.
    Maintainer,
    /// The underlying config (or variant) was edited directly while this
    /// proposal was still pending, superseding it (§3, bulk-reject rule).
    RejectedByConfigEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected { reason: RejectionReason },
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

/// A single environment variant targeted by a proposal that touches
/// variants rather than (or in addition to) the config's default value.
/// A proposal can roll the same proposed value out to more than one
/// environment at once, each anchored to its own variant's version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantProposalTarget {
    pub config_variant_id: ConfigVariantId,
    pub environment_id: EnvironmentId,
    pub base_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigProposal {
    pub id: ConfigProposalId,
    pub config_id: ConfigId,
    /// Empty targets the config's default variant; non-empty targets one
    /// or more environment variants.
    pub variant_targets: Vec<VariantProposalTarget>,
    /// Whether this proposal deletes its target(s) rather than changing
    /// their value. Mutually exclusive in practice with a meaningful
    /// `proposed_value`, which is ignored when `is_delete` is set.
    pub is_delete: bool,
    pub proposed_value: Value,
    pub proposed_schema: Option<Value>,
    pub proposed_use_base_schema: bool,
    pub proposed_overrides: Vec<Override>,
    /// The config's version this proposal was based on when it targets
    /// the default variant (`variant_targets` empty); unused otherwise,
    /// since each variant target carries its own `base_version`.
    pub base_version: u64,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
}

impl ConfigProposal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config_id: ConfigId,
        variant_targets: Vec<VariantProposalTarget>,
        is_delete: bool,
        proposed_value: Value,
        proposed_schema: Option<Value>,
        proposed_use_base_schema: bool,
        proposed_overrides: Vec<Override>,
        base_version: u64,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConfigProposalId::new(),
            config_id,
            variant_targets,
            is_delete,
            proposed_value,
            proposed_schema,
            proposed_use_base_schema,
            proposed_overrides,
            base_version,
            status: ProposalStatus::Pending,
            created_at: now,
            created_by,
            resolved_at: None,
            resolved_by: None,
        }
    }

    /// `true` when this proposal targets the config's default variant
    /// rather than one or more environment variants.
    pub fn targets_default(&self) -> bool {
        self.variant_targets.is_empty()
    }

    /// Moves a pending proposal to a terminal state. Fails if it has
    /// already been resolved (approve/reject are one-shot, §3).
    fn resolve(&mut self, status: ProposalStatus, resolved_by: UserId, now: DateTime<Utc>) -> Result<(), ReplaneError> {
        if self.status.is_terminal() {
            return Err(ReplaneError::conflict("this proposal has already been resolved"));
        }
        self.status = status;
        self.resolved_at = Some(now);
        self.resolved_by = Some(resolved_by);
        Ok(())
    }

    pub fn approve(&mut self, resolved_by: UserId, now: DateTime<Utc>) -> Result<(), ReplaneError> {
        self.resolve(ProposalStatus::Approved, resolved_by, now)
    }

    pub fn reject(&mut self, reason: RejectionReason, resolved_by: UserId, now: DateTime<Utc>) -> Result<(), ReplaneError> {
        self.resolve(ProposalStatus::Rejected { reason }, resolved_by, now)
    }
}

impl ConfigProposal {
    /// The authority required to resolve (approve or reject) this proposal.
    /// A deletion, a schema change, or a proposal that isn't aimed solely
    /// at the default variant's value/overrides needs a maintainer;
    /// everything else (an ordinary value or override edit) only needs
    /// editor authority (§4.4, §4.7).
    pub fn required_action(&self) -> Action {
        if self.is_delete || self.proposed_schema.is_some() {
            Action::ManageConfig
        } else {
            Action::EditConfigValue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigProposal {
        ConfigProposal::new(ConfigId::new(), Vec::new(), false, serde_json::json!(true), None, true, Vec::new(), 1, UserId::new(), Utc::now())
    }

    #[test]
    fn approve_then_reject_fails() {
        let mut p = sample();
        p.approve(UserId::new(), Utc::now()).unwrap();
        assert!(p.reject(RejectionReason::Maintainer, UserId::new(), Utc::now()).is_err());
    }

    #[test]
    fn pending_is_not_terminal_but_both_resolutions_are() {
        let p = sample();
        assert!(!p.status.is_terminal());
        assert!(ProposalStatus::Approved.is_terminal());
        assert!(ProposalStatus::Rejected { reason: RejectionReason::Maintainer }.is_terminal());
    }

    #[test]
    fn value_only_proposal_needs_only_editor_authority_but_delete_needs_maintainer() {
        let mut p = sample();
        assert_eq!(p.required_action(), Action::EditConfigValue);
        p.is_delete = true;
        assert_eq!(p.required_action(), Action::ManageConfig);
    }

    #[test]
    fn schema_change_needs_maintainer_even_without_delete() {
        let mut p = sample();
        p.proposed_schema = Some(serde_json::json!({"type": "boolean"}));
        assert_eq!(p.required_action(), Action::ManageConfig);
    }
}
