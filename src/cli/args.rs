//! CLI argument definitions using clap
//!
//! Commands:
//! - schemavault tenants
//! - schemavault add-tenant --id <id> --name <name> --code <code>
//! - schemavault snapshots --tenant <id>
//! - schemavault dump --tenant <id> [--label <label>]
//! - schemavault restore --tenant <id> --file <filename> [--to-temp]
//! - schemavault promote --tenant <id>
//! - schemavault discard --tenant <id>
//! - schemavault annotate --tenant <id> --file <filename> [--title] [--description]
//! - schemavault delete-snapshot --tenant <id> --file <filename> [--keep-remote]
//! - schemavault delete-tenant --tenant <id>
//! - schemavault prune --tenant <id>
//! - schemavault schedule

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// schemavault - per-tenant PostgreSQL schema snapshots, restores, and
/// promotion
#[derive(Parser, Debug)]
#[command(name = "schemavault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file; VAULT_* environment variables are
    /// used when absent
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the tenant registry file
    #[arg(long, global = true, default_value = "./tenants.json")]
    pub tenants_file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List active tenants
    Tenants,

    /// Register a tenant in the registry
    AddTenant {
        /// Numeric tenant id
        #[arg(long)]
        id: i64,

        /// Display name
        #[arg(long)]
        name: String,

        /// Short code
        #[arg(long)]
        code: String,

        /// Production schema name (default: tenant_<id>)
        #[arg(long)]
        schema: Option<String>,
    },

    /// List a tenant's snapshots, newest first
    Snapshots {
        /// Tenant id
        #[arg(long)]
        tenant: i64,
    },

    /// Snapshot a tenant's production schema
    Dump {
        /// Tenant id
        #[arg(long)]
        tenant: i64,

        /// Snapshot label (default: today's date, overwriting any earlier
        /// snapshot from the same day)
        #[arg(long)]
        label: Option<String>,
    },

    /// Restore a snapshot into production, or into the temp schema
    Restore {
        /// Tenant id
        #[arg(long)]
        tenant: i64,

        /// Snapshot filename
        #[arg(long)]
        file: String,

        /// Restore into the parallel temp schema instead of production
        #[arg(long)]
        to_temp: bool,
    },

    /// Promote the temp schema over production
    Promote {
        /// Tenant id
        #[arg(long)]
        tenant: i64,
    },

    /// Drop the temp schema and its registry row
    Discard {
        /// Tenant id
        #[arg(long)]
        tenant: i64,
    },

    /// Set a snapshot's title and description
    Annotate {
        /// Tenant id
        #[arg(long)]
        tenant: i64,

        /// Snapshot filename
        #[arg(long)]
        file: String,

        /// Short title
        #[arg(long)]
        title: Option<String>,

        /// Longer description
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete one snapshot
    DeleteSnapshot {
        /// Tenant id
        #[arg(long)]
        tenant: i64,

        /// Snapshot filename
        #[arg(long)]
        file: String,

        /// Leave the mirrored copy in place (deleted by default)
        #[arg(long)]
        keep_remote: bool,
    },

    /// Remove a tenant, dropping its schemas
    DeleteTenant {
        /// Tenant id
        #[arg(long)]
        tenant: i64,
    },

    /// Trim a tenant's snapshots to the retention count
    Prune {
        /// Tenant id
        #[arg(long)]
        tenant: i64,
    },

    /// Run the daily snapshot scheduler until interrupted
    Schedule,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_snapshot_removes_mirror_by_default() {
        let cli = Cli::try_parse_from([
            "schemavault",
            "delete-snapshot",
            "--tenant",
            "5",
            "--file",
            "tenant_5_20260827.sql.gz",
        ])
        .unwrap();
        match cli.command {
            Command::DeleteSnapshot { keep_remote, .. } => assert!(!keep_remote),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_delete_snapshot_can_keep_the_mirror() {
        let cli = Cli::try_parse_from([
            "schemavault",
            "delete-snapshot",
            "--tenant",
            "5",
            "--file",
            "tenant_5_20260827.sql.gz",
            "--keep-remote",
        ])
        .unwrap();
        match cli.command {
            Command::DeleteSnapshot { keep_remote, .. } => assert!(keep_remote),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
