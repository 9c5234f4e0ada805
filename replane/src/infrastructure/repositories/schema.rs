// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema helpers shared by repository implementations.
//!
//! Applies migrations on start-up so integration tests and services see a
//! consistent database.

use sqlx::migrate::MigrateDatabase;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations against the provided SQLite pool.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("ensuring database schema is up to date");

    sqlx::migrate!("../migrations").run(pool).await?;

    info!("database schema is up to date");
    Ok(())
}

/// Creates a new SQLite database file if it doesn't exist.
///
/// `SqlitePool::connect` fails if the target file is absent, so this is
/// called before connecting on cold start.
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if !sqlx::Sqlite::database_exists(database_url).await? {
        debug!(database_url, "database does not exist, creating");
        sqlx::Sqlite::create_database(database_url).await?;
        info!(database_url, "created new SQLite database");
    } else {
        debug!(database_url, "database already exists");
    }
    Ok(())
}

/// Creates the database if missing, connects, and applies migrations —
/// the single entry point bootstrap calls on start-up.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    create_database_if_missing(database_url).await?;
    let pool = SqlitePool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn create_database_if_missing_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        create_database_if_missing(&db_url).await.unwrap();
    }

    #[tokio::test]
    async fn initialize_database_creates_expected_tables() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        let pool = initialize_database(&db_url).await.unwrap();

        let result: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='configs'")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result, 1, "configs table should exist");
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{db_path}");
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        let pool = SqlitePool::connect(&db_url).await.unwrap();

        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
