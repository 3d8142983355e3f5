//! CLI module for schemavault
//!
//! Provides the command-line interface for:
//! - tenant registry maintenance (add-tenant, tenants, delete-tenant)
//! - snapshot operations (dump, snapshots, annotate, delete-snapshot, prune)
//! - lifecycle operations (restore, promote, discard)
//! - the long-running daily scheduler (schedule)

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run_command;
pub use errors::{CliError, CliResult};

/// Parse arguments and run the selected command on a fresh runtime.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::io_error(format!("failed to start runtime: {}", e)))?;
    runtime.block_on(run_command(cli))
}
