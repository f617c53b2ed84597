//! Deadline-bounded job polling.
//!
//! The cadence is fixed: no backoff and no jitter. Waiting is a tokio
//! timer, so other operations progress while one job sleeps. Elapsed time
//! is measured from the first poll and never reset. Each status query is
//! bounded by the time left, so a provider that stops answering cannot
//! hold a caller past its deadline.

use crate::JobError;
use provider::{Job, JobStatus, Provider};
use std::{sync::Arc, time::Duration};
use tokio::time::{self, Instant};

/// Interval between two status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// How a job is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between status queries.
    pub interval: Duration,
    /// Consecutive transport failures one status query may absorb before
    /// failing. Zero turns any failed query into a hard failure.
    pub transport_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            transport_retries: 0,
        }
    }
}

/// Waits for jobs to finish.
pub struct Poller<P> {
    provider: Arc<P>,
    policy: PollPolicy,
}

impl<P: Provider> Poller<P> {
    /// Create a poller over a shared provider.
    pub fn new(provider: Arc<P>, policy: PollPolicy) -> Self {
        Self { provider, policy }
    }

    /// The active policy.
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Start watching one job.
    pub fn watch(&self, job_id: impl Into<String>) -> JobWatch<'_, P> {
        JobWatch {
            provider: self.provider.as_ref(),
            policy: self.policy,
            job_id: job_id.into(),
            terminal: None,
            queries: 0,
        }
    }

    /// Poll `job_id` until it succeeds, fails, or `deadline` elapses.
    pub async fn await_completion(
        &self,
        job_id: &str,
        deadline: Duration,
    ) -> Result<Job, JobError> {
        if job_id.is_empty() {
            return Err(JobError::InvalidRequest("job id is empty".into()));
        }
        if deadline.is_zero() {
            return Err(JobError::InvalidRequest("deadline must be positive".into()));
        }

        let started = Instant::now();
        let mut watch = self.watch(job_id);
        loop {
            let remaining = deadline.saturating_sub(started.elapsed());
            let Ok(polled) = time::timeout(remaining, watch.poll()).await else {
                let elapsed = started.elapsed();
                tracing::warn!("status query for {job_id} outlived the deadline ({elapsed:?})");
                return Err(JobError::Timeout {
                    job_id: job_id.to_owned(),
                    elapsed,
                });
            };
            let job = polled?;
            match job.status {
                JobStatus::Success => {
                    tracing::info!(
                        "job {job_id} succeeded after {} queries",
                        watch.queries()
                    );
                    return Ok(job);
                }
                JobStatus::Failed => {
                    tracing::warn!("job {job_id} failed");
                    return Err(JobError::Failed { job: Box::new(job) });
                }
                status => tracing::debug!("job {job_id} is {status:?}"),
            }

            let elapsed = started.elapsed();
            if elapsed >= deadline {
                tracing::warn!("job {job_id} timed out after {elapsed:?}");
                return Err(JobError::Timeout {
                    job_id: job_id.to_owned(),
                    elapsed,
                });
            }
            time::sleep(self.policy.interval.min(deadline - elapsed)).await;
        }
    }
}

/// Polling state for one job.
///
/// Once a terminal status has been read it is cached: further polls
/// return it without querying the provider again.
pub struct JobWatch<'p, P> {
    provider: &'p P,
    policy: PollPolicy,
    job_id: String,
    terminal: Option<Job>,
    queries: u32,
}

impl<P: Provider> JobWatch<'_, P> {
    /// Read the job's current state.
    pub async fn poll(&mut self) -> Result<Job, JobError> {
        if let Some(job) = &self.terminal {
            return Ok(job.clone());
        }

        let job = self.query().await?;
        if job.status.is_terminal() {
            self.terminal = Some(job.clone());
        }
        Ok(job)
    }

    /// The watched job id.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Status queries sent so far.
    pub fn queries(&self) -> u32 {
        self.queries
    }

    /// The cached terminal job, once observed.
    pub fn terminal(&self) -> Option<&Job> {
        self.terminal.as_ref()
    }

    async fn query(&mut self) -> Result<Job, JobError> {
        let mut failures = 0;
        loop {
            self.queries += 1;
            match self.provider.job(&self.job_id).await {
                Ok(job) => return Ok(job),
                Err(e) if e.is_transport() && failures < self.policy.transport_retries => {
                    failures += 1;
                    tracing::warn!(
                        "status query for {} failed ({failures}/{}): {e}",
                        self.job_id,
                        self.policy.transport_retries
                    );
                }
                Err(e) => return Err(JobError::Poll(e)),
            }
        }
    }
}
