// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Unix exit code mapping so operators and process supervisors can
//! distinguish failure classes without parsing log output.

use std::process::ExitCode as StdExitCode;

/// Sysexits-inspired exit codes for the `replane-server` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GenericFailure = 1,
    /// CLI argument or configuration parsing failed (sysexits EX_USAGE).
    Usage = 64,
    /// Configuration file content was invalid (sysexits EX_CONFIG).
    Config = 78,
    /// Could not reach or migrate the database (sysexits EX_UNAVAILABLE).
    Unavailable = 69,
}

impl From<ExitCode> for StdExitCode {
    fn from(code: ExitCode) -> Self {
        StdExitCode::from(code as u8)
    }
}

/// Maps a top-level `anyhow::Error` from `main` to a process exit code.
/// Bootstrap errors are tagged by the stage that produced them; anything
/// else is treated as a generic failure.
pub fn map_error_to_exit_code(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(stage) = cause.downcast_ref::<BootstrapStage>() {
            return match stage {
                BootstrapStage::Cli => ExitCode::Usage,
                BootstrapStage::Config => ExitCode::Config,
                BootstrapStage::Database => ExitCode::Unavailable,
            };
        }
    }
    ExitCode::GenericFailure
}

/// Marker attached via `.context(BootstrapStage::X)` to errors raised
/// during a specific bootstrap phase, so `map_error_to_exit_code` can
/// recover which sysexits bucket applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapStage {
    #[error("during CLI parsing")]
    Cli,
    #[error("during configuration loading")]
    Config,
    #[error("during database setup")]
    Database,
}

pub fn result_to_exit_code(result: anyhow::Result<()>) -> StdExitCode {
    match result {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            tracing::error!("{err:?}");
            map_error_to_exit_code(&err).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn maps_config_stage_errors_to_config_exit_code() {
        let err: anyhow::Error = anyhow::anyhow!("bad toml").context(BootstrapStage::Config);
        assert_eq!(map_error_to_exit_code(&err), ExitCode::Config);
    }

    #[test]
    fn untagged_errors_map_to_generic_failure() {
        let err = anyhow::anyhow!("something went wrong");
        assert_eq!(map_error_to_exit_code(&err), ExitCode::GenericFailure);
    }
}
