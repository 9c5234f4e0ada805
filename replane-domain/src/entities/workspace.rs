// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Workspace: the top-level tenant container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReplaneError;
use crate::ids::WorkspaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub email: String,
    pub role: WorkspaceRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub auto_add_new_users: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: String, auto_add_new_users: bool, now: DateTime<Utc>) -> Self {
        Self { id: WorkspaceId::new(), name, auto_add_new_users, created_at: now, updated_at: now }
    }
}

/// Returns an error unless `members` (the roster *after* the proposed
/// change) retains at least one admin. Every member-mutating operation on
/// a workspace must call this before committing (§3 invariants).
pub fn ensure_has_admin(members: &[WorkspaceMember]) -> Result<(), ReplaneError> {
    if members.iter().any(|m| m.role == WorkspaceRole::Admin) {
        Ok(())
    } else {
        Err(ReplaneError::bad_request("a workspace must always have at least one admin"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_removing_the_last_admin() {
        let members = vec![WorkspaceMember { email: "a@example.com".into(), role: WorkspaceRole::Member }];
        assert!(ensure_has_admin(&members).is_err());
    }

    #[test]
    fn accepts_roster_with_an_admin() {
        let members = vec![WorkspaceMember { email: "a@example.com".into(), role: WorkspaceRole::Admin }];
        assert!(ensure_has_admin(&members).is_ok());
    }
}
