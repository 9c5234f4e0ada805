// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! ConfigService: the atomic edit operations shared by direct edits,
//! proposal approval, and version restore — every path that mutates a
//! config or variant's live value goes through here so the version check,
//! snapshot, audit entry, and bulk proposal rejection (§3) always happen
//! together. The `apply_*` free functions take an open transaction so
//! `ProposalService::approve` can fold the mutation into the same
//! transaction as the proposal's own status change (§3: approval must be
//! atomic with the edit it applies).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool, Transaction};

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::entities::config::Config;
use replane_domain::entities::config_variant::ConfigVariant;
use replane_domain::entities::proposal::RejectionReason;
use replane_domain::entities::version::{ConfigVariantVersion, ConfigVersion};
use replane_domain::error::ReplaneError;
use replane_domain::ids::{ConfigId, ConfigProposalId, ProjectId, UserId};
use replane_domain::services::json_schema;
use replane_domain::value_objects::override_rule::Override;

use crate::infrastructure::stores::{audit_logs, config_proposals, config_variant_versions, config_variants, config_versions, configs};

pub struct ConfigService {
    pool: SqlitePool,
}

impl ConfigService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Applies a direct edit to a config's default variant: rejects a
    /// stale `expected_version`, validates the new value against its own
    /// schema, bumps the version, snapshots it, records an audit entry,
    /// and rejects every other proposal still pending against this
    /// config (§3 bulk-reject rule).
    #[allow(clippy::too_many_arguments)]
    pub async fn update_config(
        &self,
        config: Config,
        project_id: ProjectId,
        expected_version: u64,
        value: Value,
        schema: Option<Value>,
        overrides: Vec<Override>,
        actor: UserId,
    ) -> Result<Config, ReplaneError> {
        json_schema::validate_optional(schema.as_ref(), &value)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        let updated = apply_config_update(&mut tx, config, project_id, expected_version, value, schema, overrides, actor, now).await?;
        reject_pending_proposals(&mut tx, updated.id, actor, now, None).await?;
        tx.commit().await.map_err(map_tx_err)?;
        Ok(updated)
    }

    /// Applies a direct edit to an environment-specific variant. Mirrors
    /// `update_config` but snapshots into `config_variant_versions` and
    /// tags the audit entry with the environment.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_variant(
        &self,
        variant: ConfigVariant,
        project_id: ProjectId,
        expected_version: u64,
        value: Value,
        schema: Option<Value>,
        use_base_schema: bool,
        overrides: Vec<Override>,
        actor: UserId,
        base_config_schema: Option<&Value>,
    ) -> Result<ConfigVariant, ReplaneError> {
        json_schema::validate_optional(schema.as_ref(), &value)?;
        if use_base_schema || schema.is_none() {
            json_schema::validate_optional(base_config_schema, &value)?;
        }

        let now = Utc::now();
        let config_id = variant.config_id;
        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        let updated =
            apply_variant_update(&mut tx, variant, project_id, expected_version, value, schema, use_base_schema, overrides, actor, now)
                .await?;
        reject_pending_proposals(&mut tx, config_id, actor, now, None).await?;
        tx.commit().await.map_err(map_tx_err)?;
        Ok(updated)
    }

    /// Restores a config to the value/schema/overrides captured at
    /// `restored_version`, recording the restore as a brand new version
    /// rather than rewinding history (§2).
    pub async fn restore_config_version(
        &self,
        config: Config,
        project_id: ProjectId,
        restored_version: u64,
        actor: UserId,
    ) -> Result<Config, ReplaneError> {
        let snapshot = config_versions::get_by_config_and_version(&self.pool, config.id, restored_version)
            .await?
            .ok_or_else(|| ReplaneError::not_found("no such config version"))?;

        let expected_version = config.version;
        let restored = self
            .update_config(config, project_id, expected_version, snapshot.value, snapshot.schema, snapshot.overrides, actor)
            .await?;

        audit_logs::create(
            &self.pool,
            &AuditLog::new(
                Some(actor),
                Some(project_id),
                Some(restored.id),
                AuditPayload::ConfigVersionRestored {
                    config_id: restored.id,
                    restored_version,
                    new_version: restored.version,
                },
                Utc::now(),
            ),
        )
        .await?;

        Ok(restored)
    }

    /// Deletes a config outright, recording a snapshot of its final value
    /// in the audit payload since the row itself will no longer be
    /// queryable (§11).
    pub async fn delete_config(&self, config: Config, project_id: ProjectId, actor: UserId) -> Result<(), ReplaneError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        apply_config_delete(&mut tx, config, project_id, actor, now).await?;
        tx.commit().await.map_err(map_tx_err)?;
        Ok(())
    }

    /// Restores a variant to the value/schema/overrides captured at
    /// `restored_version`, mirroring `restore_config_version`.
    pub async fn restore_variant_version(
        &self,
        variant: ConfigVariant,
        project_id: ProjectId,
        restored_version: u64,
        actor: UserId,
        base_config_schema: Option<&Value>,
    ) -> Result<ConfigVariant, ReplaneError> {
        let snapshot = config_variant_versions::get_by_variant_and_version(&self.pool, variant.id, restored_version)
            .await?
            .ok_or_else(|| ReplaneError::not_found("no such variant version"))?;

        let expected_version = variant.version;
        let restored = self
            .update_variant(
                variant,
                project_id,
                expected_version,
                snapshot.value,
                snapshot.schema,
                snapshot.use_base_schema,
                snapshot.overrides,
                actor,
                base_config_schema,
            )
            .await?;

        audit_logs::create(
            &self.pool,
            &AuditLog::new(
                Some(actor),
                Some(project_id),
                Some(restored.config_id),
                AuditPayload::ConfigVariantVersionRestored {
                    config_variant_id: restored.id,
                    restored_version,
                    new_version: restored.version,
                },
                Utc::now(),
            ),
        )
        .await?;

        Ok(restored)
    }

    /// Deletes a variant, leaving the config's default value and any
    /// other environments' variants untouched.
    pub async fn delete_variant(&self, variant: ConfigVariant, project_id: ProjectId, actor: UserId) -> Result<(), ReplaneError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_tx_err)?;
        apply_variant_delete(&mut tx, variant, project_id, actor, now).await?;
        tx.commit().await.map_err(map_tx_err)?;
        Ok(())
    }
}

/// Bumps `config`'s version, validates `expected_version` against it,
/// snapshots the new value, and records the update's audit entry, all
/// within `tx`. Shared by the direct-edit path and proposal approval so
/// both enforce the same optimistic-concurrency check (§3).
#[allow(clippy::too_many_arguments)]
pub(crate) async fn apply_config_update(
    tx: &mut Transaction<'_, Sqlite>,
    mut config: Config,
    project_id: ProjectId,
    expected_version: u64,
    value: Value,
    schema: Option<Value>,
    overrides: Vec<Override>,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Config, ReplaneError> {
    if config.version != expected_version {
        return Err(ReplaneError::version_mismatch("the config has changed since you last loaded it"));
    }

    let from_version = config.version;
    config.apply_update(value, schema, overrides, now);
    configs::update(&mut **tx, &config).await?;

    let snapshot =
        ConfigVersion::snapshot(config.id, config.version, config.value.clone(), config.schema.clone(), config.overrides.clone(), actor, now);
    config_versions::create(&mut **tx, &snapshot).await?;

    audit_logs::create(
        &mut **tx,
        &AuditLog::new(
            Some(actor),
            Some(project_id),
            Some(config.id),
            AuditPayload::ConfigUpdated { config_id: config.id, from_version, to_version: config.version },
            now,
        ),
    )
    .await?;

    Ok(config)
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn apply_variant_update(
    tx: &mut Transaction<'_, Sqlite>,
    mut variant: ConfigVariant,
    project_id: ProjectId,
    expected_version: u64,
    value: Value,
    schema: Option<Value>,
    use_base_schema: bool,
    overrides: Vec<Override>,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<ConfigVariant, ReplaneError> {
    if variant.version != expected_version {
        return Err(ReplaneError::version_mismatch("the variant has changed since you last loaded it"));
    }

    let from_version = variant.version;
    variant.apply_update(value, schema, use_base_schema, overrides, now);
    config_variants::update(&mut **tx, &variant).await?;

    let snapshot = ConfigVariantVersion::snapshot(
        variant.id,
        variant.version,
        variant.value.clone(),
        variant.schema.clone(),
        variant.use_base_schema,
        variant.overrides.clone(),
        actor,
        now,
    );
    config_variant_versions::create(&mut **tx, &snapshot).await?;

    audit_logs::create(
        &mut **tx,
        &AuditLog::new(
            Some(actor),
            Some(project_id),
            Some(variant.config_id),
            AuditPayload::ConfigVariantUpdated {
                config_variant_id: variant.id,
                environment_id: variant.environment_id,
                from_version,
                to_version: variant.version,
            },
            now,
        ),
    )
    .await?;

    Ok(variant)
}

pub(crate) async fn apply_config_delete(
    tx: &mut Transaction<'_, Sqlite>,
    config: Config,
    project_id: ProjectId,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<(), ReplaneError> {
    configs::delete(&mut **tx, config.id).await?;
    audit_logs::create(
        &mut **tx,
        &AuditLog::new(
            Some(actor),
            Some(project_id),
            None,
            AuditPayload::ConfigDeleted { config_id: config.id, key: config.key.clone(), snapshot: config.value.clone() },
            now,
        ),
    )
    .await?;
    Ok(())
}

pub(crate) async fn apply_variant_delete(
    tx: &mut Transaction<'_, Sqlite>,
    variant: ConfigVariant,
    project_id: ProjectId,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<(), ReplaneError> {
    config_variants::delete(&mut **tx, variant.id).await?;
    audit_logs::create(
        &mut **tx,
        &AuditLog::new(
            Some(actor),
            Some(project_id),
            Some(variant.config_id),
            AuditPayload::ConfigVariantDeleted { config_variant_id: variant.id, environment_id: variant.environment_id },
            now,
        ),
    )
    .await?;
    Ok(())
}

/// Rejects every pending proposal against `config_id` as superseded by a
/// direct edit (§3: "editing a config directly rejects every proposal
/// pending against it"), except `exclude` — the proposal currently being
/// approved, which this same transaction is about to mark `Approved`
/// rather than `Rejected`.
pub(crate) async fn reject_pending_proposals(
    tx: &mut Transaction<'_, Sqlite>,
    config_id: ConfigId,
    actor: UserId,
    now: DateTime<Utc>,
    exclude: Option<ConfigProposalId>,
) -> Result<(), ReplaneError> {
    let pending = config_proposals::list_pending_by_config(&mut **tx, config_id).await?;
    for mut proposal in pending {
        if Some(proposal.id) == exclude {
            continue;
        }
        proposal.reject(RejectionReason::RejectedByConfigEdit, actor, now)?;
        config_proposals::update_status(&mut **tx, &proposal).await?;
    }
    Ok(())
}

fn map_tx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}
