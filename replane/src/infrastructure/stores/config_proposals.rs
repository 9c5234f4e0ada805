// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the `config_proposals` table.

use sqlx::SqliteExecutor;

use replane_domain::entities::proposal::{ConfigProposal, ProposalStatus, RejectionReason, VariantProposalTarget};
use replane_domain::error::ReplaneError;
use replane_domain::ids::{ConfigId, ConfigProposalId};
use replane_domain::value_objects::canonical_json;
use replane_domain::value_objects::override_rule::Override;

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

fn status_to_parts(status: &ProposalStatus) -> (&'static str, Option<&'static str>) {
    match status {
        ProposalStatus::Pending => ("pending", None),
        ProposalStatus::Approved => ("approved", None),
        ProposalStatus::Rejected { reason: RejectionReason::Maintainer } => ("rejected", Some("maintainer")),
        ProposalStatus::Rejected { reason: RejectionReason::RejectedByConfigEdit } => ("rejected", Some("config_edit")),
    }
}

fn status_from_parts(status: &str, reason: Option<&str>) -> ProposalStatus {
    match (status, reason) {
        ("approved", _) => ProposalStatus::Approved,
        ("rejected", Some("config_edit")) => ProposalStatus::Rejected { reason: RejectionReason::RejectedByConfigEdit },
        ("rejected", _) => ProposalStatus::Rejected { reason: RejectionReason::Maintainer },
        _ => ProposalStatus::Pending,
    }
}

pub async fn create(exec: impl SqliteExecutor<'_>, proposal: &ConfigProposal) -> Result<(), ReplaneError> {
    let (status, reason) = status_to_parts(&proposal.status);
    sqlx::query(
        "INSERT INTO config_proposals
            (id, config_id, variant_targets, is_delete, proposed_value, proposed_schema,
             proposed_use_base_schema, proposed_overrides, base_version, status, rejection_reason,
             created_at, created_by, resolved_at, resolved_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(proposal.id.to_string())
    .bind(proposal.config_id.to_string())
    .bind(serde_json::to_string(&proposal.variant_targets)?)
    .bind(proposal.is_delete)
    .bind(canonical_json::to_canonical_string(&proposal.proposed_value))
    .bind(proposal.proposed_schema.as_ref().map(canonical_json::to_canonical_string))
    .bind(proposal.proposed_use_base_schema)
    .bind(canonical_json::to_canonical_string(&serde_json::to_value(&proposal.proposed_overrides)?))
    .bind(proposal.base_version as i64)
    .bind(status)
    .bind(reason)
    .bind(proposal.created_at)
    .bind(proposal.created_by.to_string())
    .bind(proposal.resolved_at)
    .bind(proposal.resolved_by.map(|id| id.to_string()))
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn get_by_id(exec: impl SqliteExecutor<'_>, id: ConfigProposalId) -> Result<Option<ConfigProposal>, ReplaneError> {
    let row = sqlx::query_as::<_, ProposalRow>(
        "SELECT id, config_id, variant_targets, is_delete, proposed_value, proposed_schema,
                proposed_use_base_schema, proposed_overrides, base_version, status, rejection_reason,
                created_at, created_by, resolved_at, resolved_by
         FROM config_proposals WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await
    .map_err(map_sqlx_err)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn list_pending_by_config(exec: impl SqliteExecutor<'_>, config_id: ConfigId) -> Result<Vec<ConfigProposal>, ReplaneError> {
    let rows = sqlx::query_as::<_, ProposalRow>(
        "SELECT id, config_id, variant_targets, is_delete, proposed_value, proposed_schema,
                proposed_use_base_schema, proposed_overrides, base_version, status, rejection_reason,
                created_at, created_by, resolved_at, resolved_by
         FROM config_proposals WHERE config_id = ? AND status = 'pending' ORDER BY created_at",
    )
    .bind(config_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn list_by_config(exec: impl SqliteExecutor<'_>, config_id: ConfigId) -> Result<Vec<ConfigProposal>, ReplaneError> {
    let rows = sqlx::query_as::<_, ProposalRow>(
        "SELECT id, config_id, variant_targets, is_delete, proposed_value, proposed_schema,
                proposed_use_base_schema, proposed_overrides, base_version, status, rejection_reason,
                created_at, created_by, resolved_at, resolved_by
         FROM config_proposals WHERE config_id = ? ORDER BY created_at DESC",
    )
    .bind(config_id.to_string())
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn update_status(exec: impl SqliteExecutor<'_>, proposal: &ConfigProposal) -> Result<(), ReplaneError> {
    let (status, reason) = status_to_parts(&proposal.status);
    sqlx::query(
        "UPDATE config_proposals SET status = ?, rejection_reason = ?, resolved_at = ?, resolved_by = ? WHERE id = ?",
    )
    .bind(status)
    .bind(reason)
    .bind(proposal.resolved_at)
    .bind(proposal.resolved_by.map(|id| id.to_string()))
    .bind(proposal.id.to_string())
    .execute(exec)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub async fn delete(exec: impl SqliteExecutor<'_>, id: ConfigProposalId) -> Result<(), ReplaneError> {
    sqlx::query("DELETE FROM config_proposals WHERE id = ?").bind(id.to_string()).execute(exec).await.map_err(map_sqlx_err)?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct ProposalRow {
    id: String,
    config_id: String,
    variant_targets: String,
    is_delete: bool,
    proposed_value: String,
    proposed_schema: Option<String>,
    proposed_use_base_schema: bool,
    proposed_overrides: String,
    base_version: i64,
    status: String,
    rejection_reason: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    created_by: String,
    resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    resolved_by: Option<String>,
}

impl TryFrom<ProposalRow> for ConfigProposal {
    type Error = ReplaneError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        Ok(ConfigProposal {
            id: row.id.parse().expect("stored proposal id is a valid uuid"),
            config_id: row.config_id.parse().expect("stored config id is a valid uuid"),
            variant_targets: serde_json::from_str::<Vec<VariantProposalTarget>>(&row.variant_targets)?,
            is_delete: row.is_delete,
            proposed_value: canonical_json::from_canonical_string(&row.proposed_value)?,
            proposed_schema: row.proposed_schema.map(|s| canonical_json::from_canonical_string(&s)).transpose()?,
            proposed_use_base_schema: row.proposed_use_base_schema,
            proposed_overrides: serde_json::from_str::<Vec<Override>>(&row.proposed_overrides)?,
            base_version: row.base_version as u64,
            status: status_from_parts(&row.status, row.rejection_reason.as_deref()),
            created_at: row.created_at,
            created_by: row.created_by.parse().expect("stored user id is a valid uuid"),
            resolved_at: row.resolved_at,
            resolved_by: row.resolved_by.map(|s| s.parse().expect("stored user id is a valid uuid")),
        })
    }
}
