// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Canonical JSON encoding.
//!
//! JSON columns (`value`, `schema`, `overrides`, audit `payload`) must
//! round-trip byte-for-byte modulo key ordering (§4.3), so snapshot diffs
//! and the `rejected_by_config_edit` invalidation logic can compare two
//! encodings for equality without deserializing. `serde_json::Value`
//! already stores object keys in a `BTreeMap` under the `preserve_order`
//! feature being *off* (the default), which sorts keys lexicographically;
//! this helper makes that guarantee explicit and centralizes it so callers
//! never rely on incidental behavior.

use serde_json::Value;

/// Serializes `value` to a canonical JSON string: object keys sorted,
/// numbers preserved as numbers.
pub fn to_canonical_string(value: &Value) -> String {
    serde_json::to_string(value).expect("Value serialization is infallible")
}

/// Parses a canonical JSON string back into a `Value`.
pub fn from_canonical_string(s: &str) -> serde_json::Result<Value> {
    serde_json::from_str(s)
}

/// `true` if two JSON values are equal once canonicalized (used to detect
/// genuinely no-op edits where that distinction matters).
pub fn canonically_equal(a: &Value, b: &Value) -> bool {
    to_canonical_string(a) == to_canonical_string(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_canonical_equality() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert!(canonically_equal(&a, &b));
    }

    #[test]
    fn round_trip_preserves_numbers_as_numbers() {
        let v = json!({"count": 42, "ratio": 1.5});
        let s = to_canonical_string(&v);
        let back = from_canonical_string(&s).unwrap();
        assert_eq!(v, back);
    }
}
