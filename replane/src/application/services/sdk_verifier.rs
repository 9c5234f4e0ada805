// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SdkVerifier: the SDK-facing read path's credential check.
//!
//! SDK keys are verified on nearly every request, so the outcome is cached
//! by raw token string with a short TTL (§5.3, §8.6). `moka`'s
//! `try_get_with` also coalesces concurrent lookups of the same token into
//! a single database round trip instead of a thundering herd.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use sqlx::SqlitePool;

use replane_domain::error::ReplaneError;
use replane_domain::ids::{EnvironmentId, SdkKeyId};
use replane_domain::services::hashing_service;
use replane_domain::services::token_codec::{self, SDK_KEY_PREFIX};

use crate::infrastructure::config::SdkVerifierConfig;
use crate::infrastructure::stores::sdk_keys;

/// The outcome of a successful verification: enough to serve a read
/// without looking the key up again.
#[derive(Debug, Clone)]
pub struct SdkVerification {
    pub key_id: SdkKeyId,
    pub environment_id: EnvironmentId,
}

pub struct SdkVerifier {
    pool: SqlitePool,
    cache: Cache<String, Arc<SdkVerification>>,
}

impl SdkVerifier {
    pub fn new(pool: SqlitePool, config: &SdkVerifierConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_size)
            .time_to_live(Duration::from_millis(config.ttl_ms))
            .build();
        Self { pool, cache }
    }

    /// Verifies a raw SDK token, returning the environment it grants
    /// access to. Malformed tokens fail before ever touching the cache or
    /// the database (§4.2).
    pub async fn verify(&self, token: &str) -> Result<Arc<SdkVerification>, ReplaneError> {
        let key_id = token_codec::extract_id(token, SDK_KEY_PREFIX)
            .map_err(|_| ReplaneError::forbidden("invalid SDK key"))?
            .into();

        let pool = self.pool.clone();
        let token = token.to_string();
        self.cache
            .try_get_with(token.clone(), async move { Self::verify_uncached(&pool, key_id, &token).await })
            .await
            .map_err(|e: Arc<ReplaneError>| (*e).clone())
    }

    async fn verify_uncached(pool: &SqlitePool, key_id: SdkKeyId, token: &str) -> Result<Arc<SdkVerification>, ReplaneError> {
        let key = sdk_keys::get_by_id(pool, key_id)
            .await?
            .ok_or_else(|| ReplaneError::forbidden("invalid SDK key"))?;

        if key.is_revoked() {
            return Err(ReplaneError::forbidden("this SDK key has been revoked"));
        }
        if !hashing_service::verify_sdk_key(&key.key_hash, token) {
            return Err(ReplaneError::forbidden("invalid SDK key"));
        }

        sdk_keys::record_use(pool, key.id, Utc::now()).await?;

        Ok(Arc::new(SdkVerification { key_id: key.id, environment_id: key.environment_id }))
    }

    /// Drops any cached verification for `token`, used when a key is
    /// revoked so the change takes effect immediately instead of waiting
    /// out the TTL.
    pub async fn invalidate(&self, token: &str) {
        self.cache.invalidate(token).await;
    }

    /// Drops every cached verification that resolved to `key_id`. The
    /// cache is keyed by raw token, not by key id, so a revoke or delete
    /// issued from the admin API (which only knows the id) has to scan
    /// the live entries rather than invalidate by key directly.
    pub async fn invalidate_key(&self, key_id: SdkKeyId) {
        let tokens: Vec<String> =
            self.cache.iter().filter(|(_, v)| v.key_id == key_id).map(|(k, _)| (*k).clone()).collect();
        for token in tokens {
            self.cache.invalidate(&token).await;
        }
    }
}
