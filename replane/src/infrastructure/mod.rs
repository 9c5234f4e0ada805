// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure: SQLite-backed stores, schema migration, and runtime
//! configuration. Everything here implements a port the application layer
//! depends on; nothing in `application` imports `sqlx` directly.

pub mod config;
pub mod repositories;
pub mod stores;
