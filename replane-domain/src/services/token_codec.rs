// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! TokenCodec: builds and parses opaque bearer tokens.
//!
//! Shape: `<prefix>_<hex(24 random bytes || 16-byte id)>`, where `prefix`
//! is `rpa` for admin keys and `rp` for SDK keys. The trailing 16 bytes of
//! the decoded payload are the stored key's UUID, which lets verification
//! look the key up by id in O(1) before ever touching the hash (§4.2).

use rand::RngCore;
use uuid::Uuid;

pub const ADMIN_KEY_PREFIX: &str = "rpa";
pub const SDK_KEY_PREFIX: &str = "rp";

const RANDOM_BYTES: usize = 24;
const ID_BYTES: usize = 16;
const PREFIX_DISPLAY_CHARS: usize = 8;
const SUFFIX_DISPLAY_CHARS: usize = 4;

/// A built token plus the clear-text display fragments stored alongside
/// its hash (never the secret itself).
pub struct BuiltToken {
    pub token: String,
    pub key_prefix: String,
    pub key_suffix: String,
}

/// Builds a new token embedding `id`, returning the full secret plus the
/// display fragments. The full token is shown to the caller exactly once.
pub fn build(prefix: &str, id: Uuid) -> BuiltToken {
    let mut random = [0u8; RANDOM_BYTES];
    rand::rng().fill_bytes(&mut random);

    let mut payload = Vec::with_capacity(RANDOM_BYTES + ID_BYTES);
    payload.extend_from_slice(&random);
    payload.extend_from_slice(id.as_bytes());

    let hex_body = hex::encode(payload);
    let token = format!("{prefix}_{hex_body}");

    let key_prefix = hex_body.chars().take(PREFIX_DISPLAY_CHARS).collect();
    let key_suffix = hex_body.chars().rev().take(SUFFIX_DISPLAY_CHARS).collect::<Vec<_>>().into_iter().rev().collect();

    BuiltToken { token, key_prefix, key_suffix }
}

/// Reasons a token failed to parse, before any store or hash lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("token prefix does not match an expected key type")]
    UnknownPrefix,
    #[error("token payload is not valid hex")]
    InvalidHex,
    #[error("token payload is too short to contain a key id")]
    TooShort,
}

/// Extracts the embedded key id from `token` without touching the
/// database or computing a hash. Malformed input yields `Err` rather than
/// panicking, per §4.2's "no store call" guarantee for garbage input.
pub fn extract_id(token: &str, expected_prefix: &str) -> Result<Uuid, ParseError> {
    let body = token.strip_prefix(expected_prefix).and_then(|s| s.strip_prefix('_')).ok_or(ParseError::UnknownPrefix)?;

    let bytes = hex::decode(body).map_err(|_| ParseError::InvalidHex)?;
    if bytes.len() < ID_BYTES {
        return Err(ParseError::TooShort);
    }
    let id_bytes = &bytes[bytes.len() - ID_BYTES..];
    Ok(Uuid::from_slice(id_bytes).expect("slice length is exactly 16"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_extract_round_trips_the_id() {
        let id = Uuid::now_v7();
        let built = build(ADMIN_KEY_PREFIX, id);
        assert!(built.token.starts_with("rpa_"));
        let extracted = extract_id(&built.token, ADMIN_KEY_PREFIX).unwrap();
        assert_eq!(extracted, id);
    }

    #[test]
    fn wrong_prefix_is_rejected() {
        let built = build(SDK_KEY_PREFIX, Uuid::now_v7());
        assert_eq!(extract_id(&built.token, ADMIN_KEY_PREFIX), Err(ParseError::UnknownPrefix));
    }

    #[test]
    fn short_hex_payload_is_rejected_without_touching_anything() {
        assert_eq!(extract_id("rp_abcd", SDK_KEY_PREFIX), Err(ParseError::TooShort));
    }

    #[test]
    fn non_hex_payload_is_rejected() {
        assert_eq!(extract_id("rp_not-hex!!", SDK_KEY_PREFIX), Err(ParseError::InvalidHex));
    }

    #[test]
    fn display_fragments_are_derived_from_hex_body() {
        let built = build(ADMIN_KEY_PREFIX, Uuid::now_v7());
        assert_eq!(built.key_prefix.len(), PREFIX_DISPLAY_CHARS);
        assert_eq!(built.key_suffix.len(), SUFFIX_DISPLAY_CHARS);
    }
}
