// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SdkKey: a credential scoped to a single environment, used by running
//! applications to fetch resolved config values at runtime. Verified far
//! more often than admin keys, so it is hashed with a fast digest rather
//! than Argon2id (§4.2) and its verification result is cached
//! (`services::sdk_verifier`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EnvironmentId, SdkKeyId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkKey {
    pub id: SdkKeyId,
    pub environment_id: EnvironmentId,
    pub name: String,
    /// SHA-256 hash of the full token.
    pub key_hash: String,
    pub key_prefix: String,
    pub key_suffix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SdkKey {
    pub fn new(
        environment_id: EnvironmentId,
        name: String,
        key_hash: String,
        key_prefix: String,
        key_suffix: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SdkKeyId::new(),
            environment_id,
            name,
            key_hash,
            key_prefix,
            key_suffix,
            created_at: now,
            last_used_at: None,
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn revoke(&mut self, now: DateTime<Utc>) {
        self.revoked_at = Some(now);
    }

    pub fn record_use(&mut self, now: DateTime<Utc>) {
        self.last_used_at = Some(now);
    }
}
