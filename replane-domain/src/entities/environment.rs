// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Environment: a named deployment context within a project (e.g. Production).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReplaneError;
use crate::ids::{EnvironmentId, ProjectId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub project_id: ProjectId,
    pub name: String,
    pub order: i32,
    pub require_proposals: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    pub fn new(project_id: ProjectId, name: String, order: i32, require_proposals: bool, now: DateTime<Utc>) -> Self {
        Self { id: EnvironmentId::new(), project_id, name, order, require_proposals, created_at: now, updated_at: now }
    }
}

/// A project must retain at least one environment (§3: "last environment
/// cannot be deleted").
pub fn ensure_can_delete(remaining_count: usize) -> Result<(), ReplaneError> {
    if remaining_count == 0 {
        Err(ReplaneError::bad_request("cannot delete the last environment of a project"))
    } else {
        Ok(())
    }
}
