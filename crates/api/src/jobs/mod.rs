//! Background jobs and their scheduler.

mod email_queue;
mod pool_metrics;
mod scheduler;
mod security_log_retention;
mod session_cleanup;
mod worker_health;

pub use email_queue::EmailQueueJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
pub use security_log_retention::SecurityLogRetentionJob;
pub use session_cleanup::SessionCleanupJob;
pub use worker_health::WorkerHealthJob;

use crate::app::AppState;

/// Scheduler with every background job registered, not yet started.
pub fn scheduler(state: &AppState) -> JobScheduler {
    let mut scheduler = JobScheduler::new();
    scheduler.register(WorkerHealthJob::new(state.clone()));
    scheduler.register(EmailQueueJob::new(
        state.pool.clone(),
        state.email.clone(),
        &state.config.email,
    ));
    scheduler.register(SessionCleanupJob::new(state.pool.clone(), state.login_limiter.clone()));
    scheduler.register(SecurityLogRetentionJob::new(
        state.pool.clone(),
        state.config.security_logs.retention_days,
    ));
    scheduler.register(PoolMetricsJob::new(state.pool.clone()));
    scheduler
}
