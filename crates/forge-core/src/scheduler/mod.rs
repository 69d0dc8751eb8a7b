//! Scheduler de jobs con concurrencia local acotada.

mod job;
mod pool;

pub use job::{Job, JobId};
pub use pool::JobScheduler;
