// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Project: a grouping of configs and environments within a workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReplaneError;
use crate::ids::{ProjectId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Admin,
    Maintainer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectUser {
    pub email: String,
    pub role: ProjectRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub require_proposals: bool,
    pub allow_self_approvals: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        workspace_id: WorkspaceId,
        name: String,
        description: Option<String>,
        require_proposals: bool,
        allow_self_approvals: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProjectId::new(),
            workspace_id,
            name,
            description,
            require_proposals,
            allow_self_approvals,
            created_at: now,
            updated_at: now,
        }
    }
}

/// At least one project admin must remain after any membership change (§3).
pub fn ensure_has_admin(users: &[ProjectUser]) -> Result<(), ReplaneError> {
    if users.iter().any(|u| u.role == ProjectRole::Admin) {
        Ok(())
    } else {
        Err(ReplaneError::bad_request("a project must always have at least one admin"))
    }
}

/// A workspace must always keep at least one project.
pub fn ensure_can_delete(remaining_count: usize) -> Result<(), ReplaneError> {
    if remaining_count == 0 {
        Err(ReplaneError::bad_request("cannot delete the last project of a workspace"))
    } else {
        Ok(())
    }
}
