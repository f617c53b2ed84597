//! The submit, wait, resolve pipeline.

use crate::{JobError, OutputDescriptor, PollPolicy, Poller, Resolver};
use provider::{Provider, ProviderError};
use std::{future::Future, sync::Arc, time::Duration};

/// Deadline classes for orchestrated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineClass {
    /// Generation, transformation, background removal.
    Standard,
    /// Upscaling.
    Heavy,
}

/// Per-class polling deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub standard: Duration,
    pub heavy: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            standard: Duration::from_millis(120_000),
            heavy: Duration::from_millis(180_000),
        }
    }
}

impl Deadlines {
    pub fn get(&self, class: DeadlineClass) -> Duration {
        match class {
            DeadlineClass::Standard => self.standard,
            DeadlineClass::Heavy => self.heavy,
        }
    }
}

/// Runs one operation end to end: submission strictly precedes polling,
/// which strictly precedes resolution. Errors propagate unchanged and the
/// pipeline is never retried as a whole.
pub struct Orchestrator<P> {
    poller: Poller<P>,
    resolver: Resolver<P>,
    deadlines: Deadlines,
}

impl<P: Provider> Orchestrator<P> {
    pub fn new(provider: Arc<P>, policy: PollPolicy, deadlines: Deadlines) -> Self {
        Self {
            poller: Poller::new(Arc::clone(&provider), policy),
            resolver: Resolver::new(provider),
            deadlines,
        }
    }

    /// Deadline overrides in effect.
    pub fn deadlines(&self) -> Deadlines {
        self.deadlines
    }

    pub fn poller(&self) -> &Poller<P> {
        &self.poller
    }

    pub fn resolver(&self) -> &Resolver<P> {
        &self.resolver
    }

    /// Invoke `submit` for a job id, wait for the job, then resolve its
    /// outputs in order.
    pub async fn run<F, Fut>(
        &self,
        submit: F,
        deadline: Duration,
    ) -> Result<Vec<OutputDescriptor>, JobError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ProviderError>>,
    {
        let job_id = submit().await.map_err(JobError::Submit)?;
        tracing::info!("submitted job {job_id}, waiting up to {deadline:?}");

        let job = self.poller.await_completion(&job_id, deadline).await?;
        let outputs = self.resolver.resolve(job.output_ids()).await?;
        tracing::info!("job {job_id} resolved into {} outputs", outputs.len());
        Ok(outputs)
    }
}
