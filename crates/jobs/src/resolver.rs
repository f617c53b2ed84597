//! Turning output ids into downloadable descriptors.

use crate::JobError;
use futures_util::future::try_join_all;
use provider::{Asset, Provider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One generated artifact, as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    pub id: String,
    /// Download URL.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<Asset> for OutputDescriptor {
    fn from(asset: Asset) -> Self {
        let props = asset.properties.unwrap_or_default();
        Self {
            id: asset.id,
            url: asset.url,
            width: props.width,
            height: props.height,
            description: asset.description,
            created_at: asset.created_at,
        }
    }
}

/// Fetches output descriptors.
pub struct Resolver<P> {
    provider: Arc<P>,
}

impl<P: Provider> Resolver<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Fetch every id concurrently and return the descriptors in input
    /// order. The first failed fetch fails the whole batch.
    pub async fn resolve(&self, ids: &[String]) -> Result<Vec<OutputDescriptor>, JobError> {
        let provider = self.provider.as_ref();
        let fetches: Vec<_> = ids.iter().map(|id| fetch(provider, id)).collect();
        let outputs = try_join_all(fetches).await?;
        tracing::debug!("resolved {} outputs", outputs.len());
        Ok(outputs)
    }
}

async fn fetch<P: Provider>(provider: &P, id: &str) -> Result<OutputDescriptor, JobError> {
    provider
        .asset(id)
        .await
        .map(OutputDescriptor::from)
        .map_err(|source| JobError::Resolution {
            failed_id: id.to_owned(),
            source,
        })
}
