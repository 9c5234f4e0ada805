// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! AdminApiKeyVerifier: turns a raw `rpa_…` bearer token into an
//! `Identity::ApiKey`, the admin-API-key analogue of `SdkVerifier`. Argon2id
//! verification is deliberately expensive (§4.2), so a verified token is
//! cached by raw value with a short TTL; `try_get_with` coalesces concurrent
//! lookups of the same token into one hash comparison instead of many.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use sqlx::SqlitePool;

use replane_domain::error::ReplaneError;
use replane_domain::identity::Identity;
use replane_domain::ids::AdminApiKeyId;
use replane_domain::services::hashing_service;
use replane_domain::services::token_codec::{self, ADMIN_KEY_PREFIX};

use crate::infrastructure::config::SdkVerifierConfig;
use crate::infrastructure::stores::admin_api_keys;

pub struct AdminApiKeyVerifier {
    pool: SqlitePool,
    cache: Cache<String, Arc<Identity>>,
}

impl AdminApiKeyVerifier {
    pub fn new(pool: SqlitePool, config: &SdkVerifierConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_size)
            .time_to_live(Duration::from_millis(config.ttl_ms))
            .build();
        Self { pool, cache }
    }

    /// Verifies a raw admin API key token, returning the `Identity::ApiKey`
    /// it grants. Malformed tokens fail before ever touching the cache or
    /// the database.
    pub async fn verify(&self, token: &str) -> Result<Arc<Identity>, ReplaneError> {
        let key_id: AdminApiKeyId = token_codec::extract_id(token, ADMIN_KEY_PREFIX)
            .map_err(|_| ReplaneError::forbidden("invalid admin API key"))?
            .into();

        let pool = self.pool.clone();
        let token = token.to_string();
        self.cache
            .try_get_with(token.clone(), async move { Self::verify_uncached(&pool, key_id, &token).await })
            .await
            .map_err(|e: Arc<ReplaneError>| (*e).clone())
    }

    async fn verify_uncached(pool: &SqlitePool, key_id: AdminApiKeyId, token: &str) -> Result<Arc<Identity>, ReplaneError> {
        let key = admin_api_keys::get_by_id(pool, key_id)
            .await?
            .ok_or_else(|| ReplaneError::forbidden("invalid admin API key"))?;

        if key.is_revoked() {
            return Err(ReplaneError::forbidden("this admin API key has been revoked"));
        }
        if !hashing_service::verify_admin_key(&key.key_hash, token) {
            return Err(ReplaneError::forbidden("invalid admin API key"));
        }

        admin_api_keys::record_use(pool, key.id, Utc::now()).await?;

        Ok(Arc::new(Identity::ApiKey {
            api_key_id: key.id,
            workspace_id: key.workspace_id,
            project_ids: key.project_ids,
            scopes: key.scopes,
        }))
    }

    /// Drops any cached verification for `token`, used when a key is
    /// revoked or deleted so the change takes effect immediately instead of
    /// waiting out the TTL.
    pub async fn invalidate(&self, token: &str) {
        self.cache.invalidate(token).await;
    }

    /// Drops every cached verification that resolved to `key_id`. The cache
    /// is keyed by raw token, not by key id, so a revoke issued from the
    /// admin API (which only knows the id) has to scan the live entries.
    pub async fn invalidate_key(&self, key_id: AdminApiKeyId) {
        let tokens: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, identity)| matches!(identity.as_ref(), Identity::ApiKey { api_key_id, .. } if *api_key_id == key_id))
            .map(|(k, _)| (*k).clone())
            .collect();
        for token in tokens {
            self.cache.invalidate(&token).await;
        }
    }
}
