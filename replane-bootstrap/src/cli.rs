// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command-line entry point for the `replane-server` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "replane-server", version, about = "Replane configuration control plane")]
pub struct Cli {
    /// Path to a TOML configuration file. Falls back to defaults and
    /// `REPLANE_*` environment overrides when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP control-plane server (the default command).
    Serve {
        /// Address to bind the management API to.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Run pending database migrations and exit.
    Migrate,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand_when_only_global_flags_given() {
        let cli = Cli::parse_from(["replane-server", "--verbose"]);
        assert!(cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_serve_with_custom_bind_address() {
        let cli = Cli::parse_from(["replane-server", "serve", "--bind", "0.0.0.0:9000"]);
        match cli.command {
            Some(Command::Serve { bind }) => assert_eq!(bind, "0.0.0.0:9000"),
            other => panic!("expected Serve, got {other:?}"),
        }
    }
}
