use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::error::{Error, Result};
use crate::services::bulk_service::BulkService;
use crate::services::email_service::EmailService;
use crate::services::interview_service::InterviewService;
use crate::services::screening_service::ScreeningService;

/// Every five minutes, at second zero.
pub const SWEEP_SCHEDULE: &str = "0 */5 * * * *";
const NO_SHOW_GRACE_MINUTES: i64 = 60;
const STUCK_BULK_MINUTES: i64 = 60;
const EXPIRED_TOKEN_KEEP_DAYS: i64 = 30;
const STALE_EMAIL_CLAIM_MINUTES: i64 = 15;

fn scheduler_error(err: JobSchedulerError) -> Error {
    Error::Internal(format!("scheduler error: {:?}", err))
}

#[derive(Clone)]
pub struct Maintenance {
    interviews: InterviewService,
    bulk: BulkService,
    screening: ScreeningService,
    email: EmailService,
}

impl Maintenance {
    pub fn new(
        interviews: InterviewService,
        bulk: BulkService,
        screening: ScreeningService,
        email: EmailService,
    ) -> Self {
        Self {
            interviews,
            bulk,
            screening,
            email,
        }
    }

    /// One pass of housekeeping; each step logs its own failure and the rest still run.
    pub async fn sweep(&self) {
        match self.interviews.mark_no_shows(NO_SHOW_GRACE_MINUTES).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "interviews marked as no-show"),
            Err(e) => tracing::error!(error = ?e, "no-show sweep failed"),
        }
        match self.bulk.fail_stuck(STUCK_BULK_MINUTES).await {
            Ok(0) => {}
            Ok(n) => tracing::warn!(count = n, "stuck bulk jobs marked as failed"),
            Err(e) => tracing::error!(error = ?e, "bulk job sweep failed"),
        }
        match self.screening.purge_expired(EXPIRED_TOKEN_KEEP_DAYS).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "expired screening tokens purged"),
            Err(e) => tracing::error!(error = ?e, "screening token purge failed"),
        }
        match self.email.release_stale(STALE_EMAIL_CLAIM_MINUTES).await {
            Ok(0) => {}
            Ok(n) => tracing::warn!(count = n, "interrupted email deliveries released"),
            Err(e) => tracing::error!(error = ?e, "email outbox sweep failed"),
        }
    }

    pub async fn start(self) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;
        let job = Job::new_async(SWEEP_SCHEDULE, move |_id, _lock| {
            let maintenance = self.clone();
            Box::pin(async move {
                maintenance.sweep().await;
            })
        })
        .map_err(scheduler_error)?;
        scheduler.add(job).await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;
        tracing::info!(schedule = SWEEP_SCHEDULE, "maintenance scheduler started");
        Ok(scheduler)
    }
}
