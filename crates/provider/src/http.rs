//! HTTP transport for the generation API.
//!
//! `HttpProvider` wraps a `reqwest::Client` with pre-built headers and the
//! API base URL. The Basic credential is computed once at construction and
//! reused for every call.

use crate::{Provider, ProviderError};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{
    Client, Method,
    header::{self, HeaderMap, HeaderValue},
};
use serde_json::Value;

/// Shared HTTP transport for the generation API.
#[derive(Clone)]
pub struct HttpProvider {
    client: Client,
    headers: HeaderMap,
    base_url: String,
}

impl HttpProvider {
    /// Production API root.
    pub const DEFAULT_BASE_URL: &str = "https://api.cloud.scenario.com/v1";

    /// Create a provider authenticating with `Basic base64(key:secret)`.
    pub fn basic(
        client: Client,
        api_key: &str,
        secret_key: &str,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let token = STANDARD.encode(format!("{api_key}:{secret_key}"));
        let mut auth = HeaderValue::from_str(&format!("Basic {token}"))
            .map_err(|e| ProviderError::Header(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, auth);
        Ok(Self {
            client,
            headers,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Get the API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

impl Provider for HttpProvider {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let url = self.url(path);
        tracing::debug!("{method} {url}");

        let mut request = self
            .client
            .request(method, &url)
            .headers(self.headers.clone());
        if let Some(body) = body {
            tracing::trace!("request: {body}");
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        tracing::trace!("response {status}: {text}");

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ProviderError::Decode {
            path: path.to_owned(),
            message: e.to_string(),
        })
    }
}

/// Flatten a reqwest error and its sources into one message.
fn transport(e: reqwest::Error) -> ProviderError {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    ProviderError::Transport(message)
}
