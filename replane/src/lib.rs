// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Replane
//!
//! The Replane control plane: a multi-tenant configuration and
//! feature-flag store with per-environment variants, conditional
//! overrides, and an optional propose/approve workflow for edits.
//!
//! This crate holds everything behind the wire protocol named in the
//! specification but not implemented by it — RPC/HTTP framing, routing,
//! and authentication middleware are external collaborators layered on
//! top of [`AppState`]. What lives here is:
//!
//! - `application::use_cases` — one module per entity (workspace,
//!   project, environment, config, config variant, proposal, admin API
//!   key, SDK key, replica), each enforcing authorization before calling
//!   into a store or service.
//! - `application::services` — the multi-step transactional logic shared
//!   by more than one use case: the atomic config/variant edit pipeline,
//!   the proposal state machine, the SDK read path's cached verifier,
//!   and resolved-config assembly for replicas.
//! - `infrastructure` — SQLite-backed stores (one module per entity),
//!   schema migration, and layered runtime configuration.
//!
//! Domain entities, value objects, and the closed error taxonomy live in
//! `replane_domain`; process composition (CLI parsing, signal handling,
//! graceful shutdown) lives in `replane_bootstrap`.

pub mod application;
pub mod infrastructure;

use std::sync::Arc;

use sqlx::SqlitePool;

use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;

use crate::application::services::admin_api_key_verifier::AdminApiKeyVerifier;
use crate::application::services::sdk_verifier::SdkVerifier;
use crate::application::use_cases::admin_api_key::AdminApiKeyUseCases;
use crate::application::use_cases::config::ConfigUseCases;
use crate::application::use_cases::config_variant::ConfigVariantUseCases;
use crate::application::use_cases::environment::EnvironmentUseCases;
use crate::application::use_cases::project::ProjectUseCases;
use crate::application::use_cases::proposal::ProposalUseCases;
use crate::application::use_cases::replica::ReplicaUseCases;
use crate::application::use_cases::sdk_key::SdkKeyUseCases;
use crate::application::use_cases::workspace::WorkspaceUseCases;
use crate::infrastructure::config::RuntimeConfig;

/// The composition root's assembled state: every use case wired to the
/// same connection pool and the same long-lived `SdkVerifier` cache, for
/// a transport layer (HTTP, RPC, an embedding test harness) to hold and
/// dispatch against.
pub struct AppState {
    pub pool: SqlitePool,
    pub config: RuntimeConfig,
    pub workspaces: WorkspaceUseCases,
    pub projects: ProjectUseCases,
    pub environments: EnvironmentUseCases,
    pub configs: ConfigUseCases,
    pub config_variants: ConfigVariantUseCases,
    pub proposals: ProposalUseCases,
    pub admin_api_keys: AdminApiKeyUseCases,
    pub sdk_keys: SdkKeyUseCases,
    pub replicas: ReplicaUseCases,
    admin_api_key_verifier: Arc<AdminApiKeyVerifier>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: RuntimeConfig) -> Self {
        let verifier = Arc::new(SdkVerifier::new(pool.clone(), &config.sdk_verifier));
        let admin_api_key_verifier = Arc::new(AdminApiKeyVerifier::new(pool.clone(), &config.admin_key_verifier));

        Self {
            workspaces: WorkspaceUseCases::new(pool.clone()),
            projects: ProjectUseCases::new(pool.clone()),
            environments: EnvironmentUseCases::new(pool.clone()),
            configs: ConfigUseCases::new(pool.clone()),
            config_variants: ConfigVariantUseCases::new(pool.clone()),
            proposals: ProposalUseCases::new(pool.clone()),
            admin_api_keys: AdminApiKeyUseCases::new(pool.clone(), Arc::clone(&admin_api_key_verifier)),
            sdk_keys: SdkKeyUseCases::new(pool.clone(), Arc::clone(&verifier)),
            replicas: ReplicaUseCases::new(pool.clone(), verifier),
            admin_api_key_verifier,
            pool,
            config,
        }
    }

    /// Authenticates a raw `rpa_…` bearer token for the management API, the
    /// entry point a transport layer calls before dispatching into any
    /// `*UseCases` method that takes an `&Identity` (§4.2).
    pub async fn authenticate_admin_key(&self, token: &str) -> Result<Identity, ReplaneError> {
        self.admin_api_key_verifier.verify(token).await.map(|identity| (*identity).clone())
    }
}
