// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Replica use cases: the SDK-facing read surface. Every call authenticates
//! with an SDK key (never a user or admin API key) rather than going
//! through `permission_service` at all — the key's environment *is* its
//! authority (§4.2, §5).

use std::sync::Arc;

use sqlx::SqlitePool;

use replane_domain::error::ReplaneError;

use crate::application::services::replica_service::{ReplicaService, ResolvedConfig};
use crate::application::services::sdk_verifier::SdkVerifier;
use crate::infrastructure::stores::environments;

pub struct ReplicaUseCases {
    replica_service: ReplicaService,
    verifier: Arc<SdkVerifier>,
    pool: SqlitePool,
}

impl ReplicaUseCases {
    pub fn new(pool: SqlitePool, verifier: Arc<SdkVerifier>) -> Self {
        let replica_service = ReplicaService::new(pool.clone());
        Self { replica_service, verifier, pool }
    }

    /// Authenticates `token` as an SDK key and resolves every config in
    /// its environment's project, overrides left unevaluated for the SDK
    /// to apply against its own request-time attributes.
    pub async fn get_configs(&self, token: &str) -> Result<Vec<ResolvedConfig>, ReplaneError> {
        let verification = self.verifier.verify(token).await?;
        let env = environments::get_by_id(&self.pool, verification.environment_id)
            .await?
            .ok_or_else(|| ReplaneError::not_found("no such environment"))?;

        self.replica_service.get_project_configs(env.project_id, env.id).await
    }

    /// Exports every config for an environment as resolved key/value/override
    /// triples (§5.4, supplementing the per-request read with a bulk
    /// snapshot for tooling and backups).
    pub async fn export_project_configs(&self, token: &str) -> Result<Vec<ResolvedConfig>, ReplaneError> {
        self.get_configs(token).await
    }
}
