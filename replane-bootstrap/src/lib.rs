// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap
//!
//! Sits **outside** the enterprise application layers (domain, application,
//! infrastructure) and owns everything a process needs before and after the
//! control plane itself runs:
//!
//! - **Entry point** - CLI parsing for `replane-server`
//! - **Signal handling** - graceful shutdown on SIGTERM/SIGINT/SIGHUP
//! - **Shutdown coordination** - cancellation-token propagation with a grace
//!   period
//! - **Bootstrap logging** - a minimal logger usable before the full
//!   application logging stack is wired up
//! - **Exit codes** - sysexits-style process exit codes so supervisors can
//!   distinguish a bad config from a database outage
//!
//! Enterprise layers never depend on this crate; only `replane-server`'s
//! `main.rs` does.

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;

pub use cli::{Cli, Command};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, BootstrapStage, ExitCode};
pub use shutdown::ShutdownCoordinator;
pub use signals::{wait_for_shutdown_signal, ShutdownSignal};
