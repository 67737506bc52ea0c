//! Background job scheduler and job implementations.

mod pool_metrics;
mod reset_token_cleanup;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use reset_token_cleanup::ResetTokenCleanupJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
