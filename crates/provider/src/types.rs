//! Wire types of the generation API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status of a remote job.
///
/// The API has used several spellings over time; the aliases fold them
/// into four states. Anything unrecognised is treated as still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// Accepted, not started.
    #[serde(alias = "queued")]
    Pending,
    /// Being processed.
    #[serde(alias = "in-progress", alias = "processing", alias = "warming-up")]
    Running,
    /// Finished; outputs are available.
    #[serde(alias = "succeeded")]
    Success,
    /// Finished without outputs.
    #[serde(alias = "failure", alias = "canceled", alias = "cancelled")]
    Failed,
    /// A status this client does not know.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// `success` and `failed` never change once observed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// A job as returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Provider-assigned identifier.
    pub job_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Outputs and diagnostics.
    #[serde(default)]
    pub metadata: JobMetadata,
    /// Fields this client does not model, kept for diagnostics.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// Output ids; empty unless the job succeeded.
    pub fn output_ids(&self) -> &[String] {
        match self.status {
            JobStatus::Success => &self.metadata.asset_ids,
            _ => &[],
        }
    }

    /// Failure detail; present only for failed jobs.
    pub fn error_detail(&self) -> Option<&Value> {
        match self.status {
            JobStatus::Failed => self.metadata.error.as_ref().or_else(|| self.extra.get("error")),
            _ => None,
        }
    }
}

/// Job metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    /// Ordered output asset ids.
    #[serde(default)]
    pub asset_ids: Vec<String>,
    /// Provider error payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Everything else.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{ job: Job }`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEnvelope {
    pub job: Job,
}

/// The job handle returned by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRef {
    pub job_id: String,
}

/// `{ job: { jobId } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitEnvelope {
    pub job: JobRef,
}

/// One stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    /// Download URL.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<AssetProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Pixel dimensions, present for image assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// `{ asset: Asset }`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetEnvelope {
    pub asset: Asset,
}

/// A generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One page of `GET /models`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPage {
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_pagination_token: Option<String>,
}

/// One page of `GET /assets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPage {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_pagination_token: Option<String>,
}
