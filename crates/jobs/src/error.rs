//! Pipeline failures.

use provider::{Job, ProviderError};
use std::time::Duration;
use thiserror::Error;

/// Why an orchestrated operation failed.
///
/// Provider failures are carried unchanged; the variant records which
/// stage of the pipeline they came from. Nothing here is retried.
#[derive(Debug, Error)]
pub enum JobError {
    /// Parameters were rejected before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The submission call failed.
    #[error("submission failed: {0}")]
    Submit(#[source] ProviderError),

    /// A status query failed.
    #[error("polling failed: {0}")]
    Poll(#[source] ProviderError),

    /// The provider marked the job failed.
    #[error("job {} failed", .job.job_id)]
    Failed {
        /// The terminal job, as last read.
        job: Box<Job>,
    },

    /// The deadline elapsed before the job reached a terminal state.
    #[error("job {job_id} did not finish within {elapsed:?}")]
    Timeout {
        /// The abandoned job. It keeps running remotely.
        job_id: String,
        /// Time spent waiting, never less than the deadline.
        elapsed: Duration,
    },

    /// One output descriptor could not be fetched.
    #[error("failed to resolve output {failed_id}: {source}")]
    Resolution {
        /// The output id whose fetch failed.
        failed_id: String,
        #[source]
        source: ProviderError,
    },

    /// A listing call failed.
    #[error("listing failed: {0}")]
    List(#[source] ProviderError),
}

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Submission,
    Polling,
    Resolution,
    Listing,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Submission => "submission",
            Self::Polling => "polling",
            Self::Resolution => "resolution",
            Self::Listing => "listing",
        }
    }
}

impl JobError {
    /// The stage that failed. Job failure and timeout both surface while
    /// polling.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidRequest(_) => Stage::Request,
            Self::Submit(_) => Stage::Submission,
            Self::Poll(_) | Self::Failed { .. } | Self::Timeout { .. } => Stage::Polling,
            Self::Resolution { .. } => Stage::Resolution,
            Self::List(_) => Stage::Listing,
        }
    }

    /// The underlying provider failure, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Submit(e) | Self::Poll(e) | Self::List(e) => Some(e),
            Self::Resolution { source, .. } => Some(source),
            _ => None,
        }
    }
}
