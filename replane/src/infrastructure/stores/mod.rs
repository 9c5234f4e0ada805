// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Free-function store modules, one per table family. Every function takes
//! `impl sqlx::SqliteExecutor<'_>` so callers can pass either a pool or an
//! open transaction, letting use cases compose several writes atomically.

pub mod admin_api_keys;
pub mod audit_logs;
pub mod config_proposals;
pub mod config_variant_versions;
pub mod config_variants;
pub mod config_versions;
pub mod configs;
pub mod environments;
pub mod projects;
pub mod sdk_keys;
pub mod workspaces;
