// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Entity Identifiers
//!
//! Type-safe identifier newtypes, one per entity category, so a
//! `ProjectId` can never be passed where a `ConfigId` is expected. Every id
//! wraps a UUIDv7, which is time-ordered: lexicographic and numeric
//! ordering of ids created by this process coincide, which is what lets
//! audit log listings order by `(created_at desc, id desc)` consistently
//! even at sub-millisecond creation rates (§5).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new, time-ordered id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(WorkspaceId);
define_id!(ProjectId);
define_id!(EnvironmentId);
define_id!(ConfigId);
define_id!(ConfigVariantId);
define_id!(ConfigVersionId);
define_id!(ConfigVariantVersionId);
define_id!(ConfigProposalId);
define_id!(AdminApiKeyId);
define_id!(SdkKeyId);
define_id!(AuditLogId);
define_id!(UserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        let id = ConfigId::new();
        let parsed: ConfigId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn successive_ids_are_time_ordered() {
        let a = AuditLogId::new();
        let b = AuditLogId::new();
        assert!(a <= b);
    }
}
