//! Command line interface for the staging release tool.
//!
//! This module wires argument parsing, Ctrl-C cancellation and command
//! dispatch together.

mod args;
pub mod commands;
mod output;

pub use args::{
    Args, Command, DeployArgs, PushTagArgs, ReleaseArgs, RuntimeConfig, ServiceArgs,
};
pub use output::OutputManager;

use crate::error::{CliError, Result, StagingError};
use tokio_util::sync::CancellationToken;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Validate and execute already-parsed arguments
pub async fn execute(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| StagingError::Cli(CliError::InvalidArguments { reason }))?;

    let runtime_config = RuntimeConfig::from(&args);
    let cancel = cancel_on_ctrl_c();

    let result = match &args.command {
        Command::Deploy(deploy) => commands::deploy(deploy, &runtime_config, cancel.clone()).await,
        Command::Release(release) => {
            commands::release(release, &runtime_config, cancel.clone()).await
        }
        Command::PushTag(push_tag) => {
            commands::push_tag(push_tag, &runtime_config, cancel.clone()).await
        }
    };

    // Stops the signal listener
    cancel.cancel();
    result
}

/// Token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    log::warn!("Interrupt received, cancelling...");
                    token.cancel();
                }
                Err(e) => log::debug!("Cannot listen for Ctrl-C: {}", e),
            },
        }
    });

    cancel
}
