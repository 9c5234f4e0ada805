// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed access to the append-only `audit_logs` table, including keyset
//! pagination ordered by `(created_at desc, id desc)` (§11).

use sqlx::SqliteExecutor;

use replane_domain::entities::audit_log::{AuditLog, AuditPayload};
use replane_domain::error::ReplaneError;
use replane_domain::ids::{AuditLogId, ConfigId, ProjectId, UserId};

fn map_sqlx_err(err: sqlx::Error) -> ReplaneError {
    ReplaneError::internal(format!("persistence error: {err}"))
}

/// Opaque cursor for keyset pagination: the `(created_at, id)` of the last
/// row returned by the previous page.
#[derive(Debug, Clone, Copy)]
pub struct AuditCursor {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub id: AuditLogId,
}

pub async fn create(exec: impl SqliteExecutor<'_>, log: &AuditLog) -> Result<(), ReplaneError> {
    sqlx::query("INSERT INTO audit_logs (id, created_at, user_id, project_id, config_id, payload) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(log.id.to_string())
        .bind(log.created_at)
        .bind(log.user_id.map(|id| id.to_string()))
        .bind(log.project_id.map(|id| id.to_string()))
        .bind(log.config_id.map(|id| id.to_string()))
        .bind(serde_json::to_string(&log.payload)?)
        .execute(exec)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

/// Lists a page of audit log entries for a project, most recent first.
/// `after` excludes entries at or before the given cursor; `limit` bounds
/// the page size.
pub async fn list_by_project(
    exec: impl SqliteExecutor<'_>,
    project_id: ProjectId,
    after: Option<AuditCursor>,
    limit: u32,
) -> Result<Vec<AuditLog>, ReplaneError> {
    let rows = match after {
        Some(cursor) => {
            sqlx::query_as::<_, LogRow>(
                "SELECT id, created_at, user_id, project_id, config_id, payload FROM audit_logs
                 WHERE project_id = ? AND (created_at < ? OR (created_at = ? AND id < ?))
                 ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .bind(project_id.to_string())
            .bind(cursor.created_at)
            .bind(cursor.created_at)
            .bind(cursor.id.to_string())
            .bind(limit as i64)
            .fetch_all(exec)
            .await
        }
        None => {
            sqlx::query_as::<_, LogRow>(
                "SELECT id, created_at, user_id, project_id, config_id, payload FROM audit_logs
                 WHERE project_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .bind(project_id.to_string())
            .bind(limit as i64)
            .fetch_all(exec)
            .await
        }
    }
    .map_err(map_sqlx_err)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn list_by_config(exec: impl SqliteExecutor<'_>, config_id: ConfigId, limit: u32) -> Result<Vec<AuditLog>, ReplaneError> {
    let rows = sqlx::query_as::<_, LogRow>(
        "SELECT id, created_at, user_id, project_id, config_id, payload FROM audit_logs
         WHERE config_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(config_id.to_string())
    .bind(limit as i64)
    .fetch_all(exec)
    .await
    .map_err(map_sqlx_err)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    created_at: chrono::DateTime<chrono::Utc>,
    user_id: Option<String>,
    project_id: Option<String>,
    config_id: Option<String>,
    payload: String,
}

impl TryFrom<LogRow> for AuditLog {
    type Error = ReplaneError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(AuditLog {
            id: row.id.parse().expect("stored audit log id is a valid uuid"),
            created_at: row.created_at,
            user_id: row.user_id.map(|s| s.parse::<UserId>().expect("stored user id is a valid uuid")),
            project_id: row.project_id.map(|s| s.parse::<ProjectId>().expect("stored project id is a valid uuid")),
            config_id: row.config_id.map(|s| s.parse::<ConfigId>().expect("stored config id is a valid uuid")),
            payload: serde_json::from_str::<AuditPayload>(&row.payload)?,
        })
    }
}
