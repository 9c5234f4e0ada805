// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! HashingService: two hashing profiles behind one interface (§4.2).
//!
//! Admin API keys are long-lived bearer secrets hashed with Argon2id
//! (memory-hard, tuned to resist offline cracking). SDK keys are verified
//! on nearly every request, so they use a fast digest instead — the
//! SDKVerifier's cache bounds how often that digest actually runs.
//! Both profiles produce a self-describing stored string so `verify` can
//! tell which algorithm produced it without a side channel.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ReplaneError;

const ADMIN_MEMORY_COST_KIB: u32 = 1 << 16;
const ADMIN_TIME_COST: u32 = 3;
const ADMIN_PARALLELISM: u32 = 1;

const SDK_HASH_PREFIX: &str = "sha256";

fn argon2_instance() -> Result<Argon2<'static>, ReplaneError> {
    let params = Params::new(ADMIN_MEMORY_COST_KIB, ADMIN_TIME_COST, ADMIN_PARALLELISM, None)
        .map_err(|e| ReplaneError::internal(format!("invalid argon2 parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes an admin API key token with Argon2id. The result embeds the
/// algorithm, parameters, and salt, so it is independently verifiable.
pub fn hash_admin_key(token: &str) -> Result<String, ReplaneError> {
    let argon2 = argon2_instance()?;
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(token.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ReplaneError::internal(format!("failed to hash admin key: {e}")))
}

/// Verifies an admin API key token against a stored Argon2id hash.
/// Constant-time by construction (argon2's own comparison).
pub fn verify_admin_key(stored_hash: &str, token: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else { return false };
    let Ok(argon2) = argon2_instance() else { return false };
    argon2.verify_password(token.as_bytes(), &parsed).is_ok()
}

/// Hashes an SDK key token with a fast digest acceptable for the hot
/// verification path.
pub fn hash_sdk_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{SDK_HASH_PREFIX}:{}", hex::encode(digest))
}

/// Verifies an SDK key token against a stored fast-digest hash, comparing
/// in constant time to avoid leaking timing information about how much of
/// the hash matched.
pub fn verify_sdk_key(stored_hash: &str, token: &str) -> bool {
    let candidate = hash_sdk_key(token);
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_key_round_trips() {
        let hash = hash_admin_key("rpa_deadbeef").unwrap();
        assert!(verify_admin_key(&hash, "rpa_deadbeef"));
        assert!(!verify_admin_key(&hash, "rpa_wrong"));
    }

    #[test]
    fn sdk_key_round_trips() {
        let hash = hash_sdk_key("rp_cafef00d");
        assert!(verify_sdk_key(&hash, "rp_cafef00d"));
        assert!(!verify_sdk_key(&hash, "rp_wrong"));
    }

    #[test]
    fn sdk_hash_is_self_describing() {
        let hash = hash_sdk_key("rp_abc");
        assert!(hash.starts_with("sha256:"));
    }
}
