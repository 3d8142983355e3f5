//! Daily snapshot scheduler
//!
//! A background task that snapshots every active tenant once per calendar
//! day. The cadence is deliberately loose: the task wakes on a fixed poll
//! interval and asks the dump engine for a daily snapshot, which is a no-op
//! whenever today's file already exists. Restarting the process mid-day
//! therefore never produces duplicates, and a poll shortly after midnight
//! picks up the new day.
//!
//! A startup grace period keeps the first cycle away from process boot, when
//! the database is typically still warming up.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::VaultConfig;
use crate::lifecycle::LifecycleManager;
use crate::observability::{Logger, Severity};

/// What one scheduler cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Active tenants visited
    pub tenants_seen: usize,
    /// New daily snapshots written
    pub snapshots_created: usize,
    /// Tenants whose snapshot attempt failed
    pub tenants_failed: usize,
}

/// Background daily-snapshot loop over a lifecycle manager.
pub struct Scheduler {
    manager: Arc<LifecycleManager>,
    grace: Duration,
    poll: Duration,
    shutdown: Arc<Notify>,
    handle: StdMutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Build a scheduler with the configured grace and poll intervals.
    pub fn new(config: &VaultConfig, manager: Arc<LifecycleManager>) -> Self {
        Self {
            manager,
            grace: Duration::from_secs(config.scheduler_grace_secs),
            poll: Duration::from_secs(config.scheduler_poll_secs),
            shutdown: Arc::new(Notify::new()),
            handle: StdMutex::new(None),
        }
    }

    /// Spawn the background loop. Idempotent: a second call while the loop
    /// is alive does nothing.
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if handle.as_ref().map_or(false, |h| !h.is_finished()) {
            return;
        }

        let manager = self.manager.clone();
        let shutdown = self.shutdown.clone();
        let grace = self.grace;
        let poll = self.poll;

        Logger::log(
            Severity::Info,
            "scheduler_started",
            &[
                ("grace_secs", &grace.as_secs().to_string()),
                ("poll_secs", &poll.as_secs().to_string()),
            ],
        );

        *handle = Some(tokio::spawn(async move {
            tokio::select! {
                _ = sleep(grace) => {}
                _ = shutdown.notified() => return,
            }
            loop {
                let stats = run_cycle(&manager).await;
                Logger::log(
                    Severity::Info,
                    "scheduler_cycle",
                    &[
                        ("tenants", &stats.tenants_seen.to_string()),
                        ("created", &stats.snapshots_created.to_string()),
                        ("failed", &stats.tenants_failed.to_string()),
                    ],
                );
                tokio::select! {
                    _ = sleep(poll) => {}
                    _ = shutdown.notified() => return,
                }
            }
        }));
    }

    /// Stop the loop and wait for it to finish. A cycle in flight completes
    /// first; the stored permit makes the next wait return immediately.
    pub async fn stop(&self) {
        self.shutdown.notify_one();
        let handle = {
            let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Logger::log(Severity::Info, "scheduler_stopped", &[]);
    }

    /// Run one cycle immediately, outside the background loop.
    pub async fn run_once(&self) -> CycleStats {
        run_cycle(&self.manager).await
    }
}

/// Snapshot every active tenant once. One tenant's failure is logged and
/// skipped; the rest of the fleet still gets its snapshot.
async fn run_cycle(manager: &LifecycleManager) -> CycleStats {
    let mut stats = CycleStats::default();

    let tenants = match manager.catalog().list_active().await {
        Ok(tenants) => tenants,
        Err(e) => {
            Logger::log_stderr(
                Severity::Error,
                "scheduler_catalog_failed",
                &[("error", &e.to_string())],
            );
            return stats;
        }
    };

    for tenant in tenants {
        stats.tenants_seen += 1;
        match manager.ensure_daily_snapshot(&tenant).await {
            Ok(Some(_)) => stats.snapshots_created += 1,
            Ok(None) => {}
            Err(e) => {
                stats.tenants_failed += 1;
                Logger::log_stderr(
                    Severity::Error,
                    "scheduler_tenant_failed",
                    &[
                        ("tenant", &tenant.id.to_string()),
                        ("schema", &tenant.schema_name),
                        ("error", &e.to_string()),
                    ],
                );
            }
        }
    }

    stats
}
