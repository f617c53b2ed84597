//! The provider seam and its typed endpoint helpers.

use crate::{
    AssetEnvelope, AssetPage, Job, JobEnvelope, ModelPage, ProviderError, SubmitEnvelope,
    types::Asset,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// One authenticated request against the generation API.
///
/// Implementations are stateless and shared across concurrent operations.
/// Uses RPITIT so callers stay generic without boxing.
pub trait Provider: Send + Sync {
    /// Perform `method path` with an optional JSON body and return the
    /// parsed body of a 2xx response.
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send;

    /// Submit a unit of work and return the job id the API assigned.
    fn submit(
        &self,
        path: &str,
        body: &Value,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        async move {
            let value = self.call(Method::POST, path, Some(body)).await?;
            let envelope: SubmitEnvelope = decode(path, value)?;
            Ok(envelope.job.job_id)
        }
    }

    /// Read the current state of a job.
    fn job(&self, job_id: &str) -> impl Future<Output = Result<Job, ProviderError>> + Send {
        async move {
            let path = format!("/jobs/{job_id}");
            let value = self.call(Method::GET, &path, None).await?;
            let envelope: JobEnvelope = decode(&path, value)?;
            Ok(envelope.job)
        }
    }

    /// Fetch the descriptor of one asset.
    fn asset(&self, asset_id: &str) -> impl Future<Output = Result<Asset, ProviderError>> + Send {
        async move {
            let path = format!("/assets/{asset_id}");
            let value = self.call(Method::GET, &path, None).await?;
            let envelope: AssetEnvelope = decode(&path, value)?;
            Ok(envelope.asset)
        }
    }

    /// List models, one page.
    fn models(
        &self,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<ModelPage, ProviderError>> + Send {
        async move {
            let path = with_query("/models", query);
            let value = self.call(Method::GET, &path, None).await?;
            decode(&path, value)
        }
    }

    /// List assets, one page.
    fn assets(
        &self,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<AssetPage, ProviderError>> + Send {
        async move {
            let path = with_query("/assets", query);
            let value = self.call(Method::GET, &path, None).await?;
            decode(&path, value)
        }
    }
}

/// Append url-encoded query pairs to an endpoint path.
pub fn with_query(path: &str, query: &[(&str, String)]) -> String {
    if query.is_empty() {
        return path.to_owned();
    }
    let mut encoder = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        encoder.append_pair(key, value);
    }
    format!("{path}?{}", encoder.finish())
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ProviderError> {
    serde_json::from_value(value).map_err(|e| ProviderError::Decode {
        path: path.to_owned(),
        message: e.to_string(),
    })
}
