// Background job scheduler
//
// Each enabled job runs in its own tokio task on a fixed interval. The task
// awaits every run before waiting for the next tick, so a job never overlaps
// itself. Missed ticks are skipped rather than bursted.
// Decision: Job failures are logged and the schedule continues

mod refresh_external_news;
mod sync_external_events;

pub use refresh_external_news::RefreshExternalNews;
pub use sync_external_events::{SyncExternalEvents, SyncReport};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::config::JobConfig;

/// A periodic background job
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<()>;
}

/// Owns the job tasks and their shutdown signal
pub struct JobScheduler {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    /// Start `job` on its schedule; disabled jobs are not started
    pub fn spawn(&mut self, job: Arc<dyn Job>, config: JobConfig) {
        if !config.enabled {
            info!(job = job.name(), "Job disabled");
            return;
        }

        info!(
            job = job.name(),
            period_secs = config.period.as_secs(),
            run_on_startup = config.run_on_startup,
            "Scheduling job"
        );
        let shutdown_rx = self.shutdown_rx.clone();
        self.handles
            .push(tokio::spawn(run_schedule(job, config, shutdown_rx)));
    }

    pub fn job_count(&self) -> usize {
        self.handles.len()
    }

    /// Signal every job to stop and wait for in-flight runs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Job task failed to stop cleanly: {}", e);
            }
        }
        info!("Job scheduler stopped");
    }
}

async fn run_schedule(job: Arc<dyn Job>, config: JobConfig, mut shutdown_rx: watch::Receiver<bool>) {
    let start = if config.run_on_startup {
        Instant::now()
    } else {
        Instant::now() + config.period
    };
    let mut interval = tokio::time::interval_at(start, config.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown_rx.changed() => break,
        }
        if *shutdown_rx.borrow() {
            break;
        }

        let started = Instant::now();
        match job.run().await {
            Ok(()) => info!(
                job = job.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job finished"
            ),
            Err(e) => error!(job = job.name(), error = %e, "Job failed"),
        }
    }

    info!(job = job.name(), "Job stopped");
}
