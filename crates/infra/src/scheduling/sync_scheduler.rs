//! Periodic sync scheduler.
//!
//! Cron-driven background job that, on every tick, walks all sync-enabled
//! users and runs channel renewal, push, and pull for each. Cancellation is
//! explicit, and each user's work is wrapped in a timeout so one stuck user
//! cannot stall the whole tick.

use std::sync::Arc;
use std::time::Duration;

use teamline_core::{ChannelManager, PullWindow, SettingsRepository, SyncEngine};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to one user's full sync pass.
    pub user_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 */15 * * * *".into(), // every 15 minutes
            user_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Sync scheduler with explicit lifecycle management.
pub struct SyncScheduler {
    scheduler: Option<JobScheduler>,
    config: SyncSchedulerConfig,
    cancellation: CancellationToken,
    settings: Arc<dyn SettingsRepository>,
    engine: Arc<SyncEngine>,
    channels: Arc<ChannelManager>,
}

impl SyncScheduler {
    pub fn new(
        cron_expression: String,
        settings: Arc<dyn SettingsRepository>,
        engine: Arc<SyncEngine>,
        channels: Arc<ChannelManager>,
    ) -> Self {
        let config = SyncSchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, settings, engine, channels)
    }

    pub fn with_config(
        config: SyncSchedulerConfig,
        settings: Arc<dyn SettingsRepository>,
        engine: Arc<SyncEngine>,
        channels: Arc<ChannelManager>,
    ) -> Self {
        Self {
            scheduler: None,
            config,
            cancellation: CancellationToken::new(),
            settings,
            engine,
            channels,
        }
    }

    /// Start the scheduler and register the periodic sync job.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        self.scheduler = Some(scheduler_instance);
        info!(cron = %self.config.cron_expression, "sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and cancel any in-flight tick.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        info!("sync scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        let cron_expr = self.config.cron_expression.clone();
        let settings = self.settings.clone();
        let engine = self.engine.clone();
        let channels = self.channels.clone();
        let cancel = self.cancellation.clone();
        let user_timeout = self.config.user_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let settings = settings.clone();
            let engine = engine.clone();
            let channels = channels.clone();
            let cancel = cancel.clone();

            Box::pin(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("sync tick cancelled before start");
                    }
                    _ = Self::run_tick(settings, engine, channels, user_timeout) => {}
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "registered sync job");
        Ok(scheduler)
    }

    /// One tick: channel renewal, push, and pull for every enabled user.
    async fn run_tick(
        settings: Arc<dyn SettingsRepository>,
        engine: Arc<SyncEngine>,
        channels: Arc<ChannelManager>,
        user_timeout: Duration,
    ) {
        let user_ids = match settings.list_enabled_user_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to list sync-enabled users");
                return;
            }
        };

        if user_ids.is_empty() {
            debug!("no sync-enabled users, tick is a no-op");
            return;
        }

        info!(user_count = user_ids.len(), "sync tick started");

        let mut failures = 0usize;
        for user_id in &user_ids {
            let passed = tokio::time::timeout(
                user_timeout,
                Self::sync_one_user(&engine, &channels, user_id),
            )
            .await;

            match passed {
                Ok(true) => {}
                Ok(false) => failures += 1,
                Err(_) => {
                    failures += 1;
                    warn!(user_id, timeout_secs = user_timeout.as_secs(), "user sync timed out");
                }
            }
        }

        info!(user_count = user_ids.len(), failures, "sync tick completed");
    }

    /// Returns false when any stage for this user failed. A failing stage
    /// never prevents the remaining stages from running.
    async fn sync_one_user(
        engine: &Arc<SyncEngine>,
        channels: &Arc<ChannelManager>,
        user_id: &str,
    ) -> bool {
        let mut ok = true;

        if let Err(e) = channels.check_and_renew(user_id).await {
            warn!(user_id, error = %e, "channel renewal failed");
            ok = false;
        }

        match engine.push_user_changes(user_id).await {
            Ok(report) if !report.is_clean() => {
                warn!(user_id, failed = report.failed, "push finished with item failures");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(user_id, error = %e, "push failed");
                ok = false;
            }
        }

        match engine.pull_provider_changes(user_id, PullWindow::default()).await {
            Ok(report) if !report.is_clean() => {
                warn!(user_id, failed = report.failed, "pull finished with item failures");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(user_id, error = %e, "pull failed");
                ok = false;
            }
        }

        ok
    }
}
