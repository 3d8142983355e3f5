//! CLI command implementations
//!
//! Each command builds the lifecycle manager from configuration, runs one
//! operation, and prints a plain-text result for the operator. Structured
//! JSON logging from the engines goes to stdout/stderr alongside; the lines
//! printed here are the human summary.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::catalog::{FileCatalog, Tenant, TenantCatalog};
use crate::config::VaultConfig;
use crate::db::{PsqlSession, SqlSession};
use crate::lifecycle::LifecycleManager;
use crate::remote::{DirMirror, RemoteStore};
use crate::scheduler::Scheduler;
use crate::store::SnapshotMeta;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Load configuration from a JSON file, or from `VAULT_*` environment
/// variables when no file is given.
fn load_config(path: Option<&Path>) -> CliResult<VaultConfig> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| CliError::config_error(format!("failed to read config: {}", e)))?;
            serde_json::from_str(&content)
                .map_err(|e| CliError::config_error(format!("invalid config JSON: {}", e)))
        }
        None => Ok(VaultConfig::from_env()),
    }
}

struct Context {
    config: VaultConfig,
    catalog: Arc<FileCatalog>,
    manager: Arc<LifecycleManager>,
}

fn build_context(cli: &Cli) -> CliResult<Context> {
    let config = load_config(cli.config.as_deref())?;
    let catalog = Arc::new(FileCatalog::open(&cli.tenants_file)?);
    let session: Arc<dyn SqlSession> = Arc::new(PsqlSession::new(&config));

    let remote: Option<Arc<dyn RemoteStore>> = if config.mirror_enabled {
        let root = config.mirror_root.clone().ok_or_else(|| {
            CliError::config_error("mirror_enabled requires mirror_root to be set")
        })?;
        Some(Arc::new(DirMirror::new(root)))
    } else {
        None
    };

    let manager = Arc::new(LifecycleManager::new(
        &config,
        catalog.clone(),
        session,
        remote,
    ));
    Ok(Context {
        config,
        catalog,
        manager,
    })
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Dispatch one parsed command.
pub async fn run_command(cli: Cli) -> CliResult<()> {
    let ctx = build_context(&cli)?;

    match cli.command {
        Command::Tenants => {
            let tenants = ctx.catalog.list_active().await?;
            if tenants.is_empty() {
                println!("no active tenants");
                return Ok(());
            }
            for t in tenants {
                println!("{:>6}  {:<24}  {:<12}  {}", t.id, t.name, t.code, t.schema_name);
            }
        }

        Command::AddTenant {
            id,
            name,
            code,
            schema,
        } => {
            let mut tenant = Tenant::new(id, name, code);
            if let Some(schema) = schema {
                tenant.schema_name = schema;
            }
            ctx.catalog.insert(tenant.clone()).await?;
            println!("registered tenant {} ({})", tenant.id, tenant.schema_name);
        }

        Command::Snapshots { tenant } => {
            let snapshots = ctx.manager.list_snapshots(tenant).await?;
            if snapshots.is_empty() {
                println!("no snapshots for tenant {}", tenant);
                return Ok(());
            }
            for s in snapshots {
                let mirrored = if s.mirrored { "mirrored" } else { "local" };
                let title = s.title.as_deref().unwrap_or("");
                println!(
                    "{:<48}  {:>10}  {}  {:<8}  {}",
                    s.filename,
                    format_size(s.size_bytes),
                    s.created_at.format("%Y-%m-%d %H:%M:%S"),
                    mirrored,
                    title,
                );
            }
        }

        Command::Dump { tenant, label } => {
            let path = ctx.manager.dump(tenant, label.as_deref()).await?;
            println!("snapshot written: {}", path.display());
        }

        Command::Restore {
            tenant,
            file,
            to_temp,
        } => {
            let outcome = ctx.manager.restore(tenant, &file, to_temp).await?;
            println!(
                "restored {} into schema {}",
                file, outcome.target_schema
            );
            if let Some(row_id) = outcome.temp_tenant_id {
                println!(
                    "temp workspace registered as tenant {} (promote or discard when done)",
                    row_id
                );
            }
        }

        Command::Promote { tenant } => {
            let outcome = ctx.manager.promote(tenant).await?;
            println!(
                "promoted {} over {} (safety snapshot: {})",
                outcome.temp_schema, outcome.production_schema, outcome.safety_snapshot
            );
        }

        Command::Discard { tenant } => {
            let outcome = ctx.manager.discard_temp(tenant).await?;
            if outcome.schema_dropped || outcome.workspace_removed {
                println!("discarded temp schema {}", outcome.temp_schema);
            } else {
                println!("nothing to discard for tenant {}", tenant);
            }
        }

        Command::Annotate {
            tenant,
            file,
            title,
            description,
        } => {
            ctx.manager
                .annotate_snapshot(tenant, &file, SnapshotMeta { title, description })
                .await?;
            println!("annotated {}", file);
        }

        Command::DeleteSnapshot {
            tenant,
            file,
            keep_remote,
        } => {
            let result = ctx
                .manager
                .delete_snapshot(tenant, &file, !keep_remote)
                .await?;
            if result.fully_deleted() {
                println!("deleted {}", result.filename);
            } else {
                println!(
                    "deleted {} locally; mirrored copy could not be removed",
                    result.filename
                );
            }
        }

        Command::DeleteTenant { tenant } => {
            let removal = ctx.manager.delete_tenant(tenant).await?;
            println!(
                "removed tenant {} (schemas dropped: {})",
                removal.tenant_id,
                if removal.dropped_schemas.is_empty() {
                    "none".to_string()
                } else {
                    removal.dropped_schemas.join(", ")
                }
            );
            if let Some(dir) = removal.preserved_snapshots {
                println!("snapshots preserved at {}", dir.display());
            }
        }

        Command::Prune { tenant } => {
            let deleted = ctx.manager.enforce_retention(tenant).await?;
            if deleted.is_empty() {
                println!("nothing to prune for tenant {}", tenant);
            } else {
                for name in &deleted {
                    println!("pruned {}", name);
                }
            }
        }

        Command::Schedule => {
            let scheduler = Scheduler::new(&ctx.config, ctx.manager.clone());
            scheduler.start();
            println!("scheduler running; press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .map_err(|e| CliError::io_error(e.to_string()))?;
            scheduler.stop().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vault.json");
        fs::write(&path, r#"{"retention": 7, "psql_bin": "/usr/bin/psql"}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.retention, 7);
        assert_eq!(config.psql_bin, "/usr/bin/psql");
        // Unspecified fields fall back to defaults
        assert_eq!(config.db.port, 5432);
    }

    #[test]
    fn test_load_config_rejects_bad_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vault.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert_eq!(err.code().code(), "VAULT_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
