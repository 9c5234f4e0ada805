// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Runtime configuration: defaults, overridden by a TOML file, overridden
//! by `REPLANE_*` environment variables (§6). Loaded once at startup by
//! the bootstrap crate and threaded through the composition root.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use replane_domain::error::ReplaneError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArgonCostConfig {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for ArgonCostConfig {
    fn default() -> Self {
        Self { memory_cost_kib: 1 << 16, time_cost: 3, parallelism: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SdkVerifierConfig {
    pub cache_size: u64,
    pub ttl_ms: u64,
}

impl Default for SdkVerifierConfig {
    fn default() -> Self {
        Self { cache_size: 10_000, ttl_ms: 60_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    pub require_proposals_default: bool,
    pub allow_self_approvals_default: bool,
    pub admin_key_hashing: ArgonCostConfig,
    pub sdk_verifier: SdkVerifierConfig,
    /// Cache sizing/TTL for `AdminApiKeyVerifier`, kept as its own knob
    /// since admin keys are verified far less often than SDK reads and
    /// can tolerate a smaller cache and shorter TTL.
    #[serde(default = "default_admin_key_verifier")]
    pub admin_key_verifier: SdkVerifierConfig,
    pub persistence_url: String,
}

fn default_admin_key_verifier() -> SdkVerifierConfig {
    SdkVerifierConfig { cache_size: 1_000, ttl_ms: 60_000 }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            require_proposals_default: false,
            allow_self_approvals_default: true,
            admin_key_hashing: ArgonCostConfig::default(),
            sdk_verifier: SdkVerifierConfig::default(),
            admin_key_verifier: default_admin_key_verifier(),
            persistence_url: "sqlite://replane.db".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Loads configuration layered default → file (if present) → env
    /// vars, then validates the result.
    pub async fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ReplaneError> {
        let mut config = Self::default();

        if let Some(path) = path {
            let path = path.as_ref();
            if fs::try_exists(path).await.unwrap_or(false) {
                let content = fs::read_to_string(path)
                    .await
                    .map_err(|e| ReplaneError::internal(format!("failed to read config file {}: {e}", path.display())))?;
                config = toml::from_str(&content)
                    .map_err(|e| ReplaneError::internal(format!("failed to parse config file {}: {e}", path.display())))?;
            } else {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("REPLANE_REQUIRE_PROPOSALS_DEFAULT") {
            if let Ok(parsed) = v.parse() {
                self.require_proposals_default = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_ALLOW_SELF_APPROVALS_DEFAULT") {
            if let Ok(parsed) = v.parse() {
                self.allow_self_approvals_default = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_ADMIN_KEY_HASH_MEMORY_COST") {
            if let Ok(parsed) = v.parse() {
                self.admin_key_hashing.memory_cost_kib = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_ADMIN_KEY_HASH_TIME_COST") {
            if let Ok(parsed) = v.parse() {
                self.admin_key_hashing.time_cost = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_ADMIN_KEY_HASH_PARALLELISM") {
            if let Ok(parsed) = v.parse() {
                self.admin_key_hashing.parallelism = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_SDK_VERIFIER_CACHE_SIZE") {
            if let Ok(parsed) = v.parse() {
                self.sdk_verifier.cache_size = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_SDK_VERIFIER_TTL_MS") {
            if let Ok(parsed) = v.parse() {
                self.sdk_verifier.ttl_ms = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_ADMIN_KEY_VERIFIER_CACHE_SIZE") {
            if let Ok(parsed) = v.parse() {
                self.admin_key_verifier.cache_size = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_ADMIN_KEY_VERIFIER_TTL_MS") {
            if let Ok(parsed) = v.parse() {
                self.admin_key_verifier.ttl_ms = parsed;
            }
        }
        if let Ok(v) = env::var("REPLANE_PERSISTENCE_URL") {
            self.persistence_url = v;
        }
    }

    fn validate(&self) -> Result<(), ReplaneError> {
        if self.persistence_url.trim().is_empty() {
            return Err(ReplaneError::internal("persistence_url must not be empty"));
        }
        if self.admin_key_hashing.parallelism == 0 {
            return Err(ReplaneError::internal("admin_key_hashing.parallelism must be at least 1"));
        }
        if self.sdk_verifier.cache_size == 0 {
            return Err(ReplaneError::internal("sdk_verifier.cache_size must be at least 1"));
        }
        if self.admin_key_verifier.cache_size == 0 {
            return Err(ReplaneError::internal("admin_key_verifier.cache_size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_defaults_when_no_file_given() {
        let config = RuntimeConfig::load::<&str>(None).await.unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[tokio::test]
    async fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replane.toml");
        tokio::fs::write(
            &path,
            r#"
            require_proposals_default = true
            allow_self_approvals_default = false
            persistence_url = "sqlite:///tmp/test.db"

            [admin_key_hashing]
            memory_cost_kib = 65536
            time_cost = 3
            parallelism = 1

            [sdk_verifier]
            cache_size = 5000
            ttl_ms = 30000
            "#,
        )
        .await
        .unwrap();

        let config = RuntimeConfig::load(Some(&path)).await.unwrap();
        assert!(config.require_proposals_default);
        assert!(!config.allow_self_approvals_default);
        assert_eq!(config.sdk_verifier.ttl_ms, 30_000);
    }

    #[test]
    fn rejects_empty_persistence_url() {
        let mut config = RuntimeConfig::default();
        config.persistence_url = "".into();
        assert!(config.validate().is_err());
    }
}
