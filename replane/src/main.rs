// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `replane-server`: the composition root. Loads configuration, applies
//! database migrations, assembles [`replane::AppState`], and either runs
//! them once (`migrate`) or holds them open until a shutdown signal
//! arrives (`serve`). The wire transport that would dispatch requests
//! into `AppState`'s use cases is an external collaborator (§6 of the
//! specification) and is not part of this binary.

use std::process::ExitCode;

use anyhow::Context;

use replane::infrastructure::config::RuntimeConfig;
use replane::infrastructure::repositories::schema::initialize_database;
use replane::AppState;
use replane_bootstrap::cli::{self, Cli, Command};
use replane_bootstrap::exit_code::{result_to_exit_code, BootstrapStage};
use replane_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use replane_bootstrap::shutdown::ShutdownCoordinator;
use replane_bootstrap::signals::wait_for_shutdown_signal;

const SHUTDOWN_GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();
    init_logging(cli.verbose);

    result_to_exit_code(run(cli).await)
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "replane=debug,replane_bootstrap=debug,replane_domain=debug" } else { "replane=info,replane_bootstrap=info" };
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(filter)).json().init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let logger = ConsoleLogger::with_prefix("replane-server");
    logger.info("starting replane-server");

    let config = RuntimeConfig::load(cli.config.as_deref()).await.context(BootstrapStage::Config)?;

    match cli.command.unwrap_or(Command::Serve { bind: default_bind() }) {
        Command::Migrate => {
            logger.info("running database migrations");
            initialize_database(&config.persistence_url).await.context(BootstrapStage::Database)?;
            logger.info("migrations complete");
            Ok(())
        }
        Command::Serve { bind } => serve(config, &bind, &logger).await,
    }
}

async fn serve(config: RuntimeConfig, bind: &str, logger: &ConsoleLogger) -> anyhow::Result<()> {
    let pool = initialize_database(&config.persistence_url).await.context(BootstrapStage::Database)?;
    let state = AppState::new(pool, config);

    logger.info(&format!("replane-server ready, accepting transport connections on {bind}"));
    tracing::info!(bind, "replane-server ready");

    let coordinator = ShutdownCoordinator::new(SHUTDOWN_GRACE_PERIOD);
    let signal = wait_for_shutdown_signal().await;
    tracing::info!(?signal, "shutdown signal received");
    coordinator.initiate_shutdown();

    state.pool.close().await;
    coordinator.complete_shutdown();
    logger.info("replane-server shut down cleanly");
    Ok(())
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
