use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::errors::AppError;
use crate::jobs::price_sync_job::{PriceSyncJob, TickOutcome};

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    price_sync: Arc<PriceSyncJob>,
    interval: Duration,
}

impl JobSchedulerService {
    pub async fn new(price_sync: Arc<PriceSyncJob>, interval: Duration) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create scheduler: {}", e))?;

        Ok(Self {
            scheduler,
            price_sync,
            interval,
        })
    }

    pub async fn start(&mut self) -> anyhow::Result<()> {
        info!("🚀 Starting job scheduler...");

        let price_sync = self.price_sync.clone();
        self.schedule_repeated("price_sync", self.interval, move || {
            let price_sync = price_sync.clone();
            async move { price_sync.run_tick().await }
        })
        .await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start scheduler: {}", e))?;

        info!("✅ Job scheduler started");
        Ok(())
    }

    pub async fn stop(&mut self) -> anyhow::Result<()> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("Failed to stop scheduler: {}", e))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }

    async fn schedule_repeated<F, Fut>(
        &mut self,
        job_name: &'static str,
        every: Duration,
        job_fn: F,
    ) -> anyhow::Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TickOutcome, AppError>> + Send + 'static,
    {
        let job_fn = Arc::new(job_fn);

        let job = Job::new_repeated_async(every, move |_uuid, _lock| {
            let job_fn = job_fn.clone();
            Box::pin(async move {
                execute_job_with_tracking(job_name, job_fn.as_ref()).await;
            })
        })
        .map_err(|e| anyhow!("Failed to create job {}: {}", job_name, e))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add job {}: {}", job_name, e))?;

        info!("📅 Scheduled: {} every {:?}", job_name, every);
        Ok(())
    }
}

async fn execute_job_with_tracking<F, Fut>(job_name: &str, job_fn: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<TickOutcome, AppError>>,
{
    let started_at = Instant::now();

    match job_fn().await {
        Ok(TickOutcome::Completed(result)) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name,
                result.items_processed,
                result.items_failed,
                started_at.elapsed().as_millis()
            );
        }
        Ok(TickOutcome::Skipped) => {}
        Err(e) => {
            error!("❌ Job failed: {} - {}", job_name, e);
        }
    }
}
