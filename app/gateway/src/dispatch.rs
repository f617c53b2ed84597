//! Tool catalogue.
//!
//! Maps MCP tool names onto [`Studio`] operations. Tool arguments are
//! deserialized straight into the operation request types, whose
//! `schemars` schemas double as the advertised input schemas.

use jobs::{
    AssetListing, ImageToImage, JobError, ModelListing, OutputDescriptor, RemoveBackground,
    Studio, TextToImage, Upscale,
};
use provider::{Provider, ProviderError};
use rmcp::{
    ErrorData,
    model::{CallToolResult, Content, JsonObject, RawResource, Tool},
};
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

pub const GENERATE_IMAGE: &str = "generate_image";
pub const TRANSFORM_IMAGE: &str = "transform_image";
pub const REMOVE_BACKGROUND: &str = "remove_background";
pub const UPSCALE_IMAGE: &str = "upscale_image";
pub const LIST_MODELS: &str = "list_models";
pub const LIST_ASSETS: &str = "list_assets";

/// A tool call that never reached the operation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Job(#[from] JobError),
}

/// Runs tools against one shared [`Studio`].
pub struct Dispatcher<P> {
    studio: Studio<P>,
}

impl<P: Provider> Dispatcher<P> {
    pub fn new(studio: Studio<P>) -> Self {
        Self { studio }
    }

    pub fn studio(&self) -> &Studio<P> {
        &self.studio
    }

    /// Every tool, in catalogue order.
    pub fn tools(&self) -> Vec<Tool> {
        vec![
            tool::<TextToImage>(
                GENERATE_IMAGE,
                "Generate images from a text prompt and wait for the results.",
            ),
            tool::<ImageToImage>(
                TRANSFORM_IMAGE,
                "Transform an existing image guided by a prompt.",
            ),
            tool::<RemoveBackground>(
                REMOVE_BACKGROUND,
                "Remove the background from an image.",
            ),
            tool::<Upscale>(UPSCALE_IMAGE, "Upscale an image by a factor of 2 or 4."),
            tool::<ModelListing>(LIST_MODELS, "List available generation models."),
            tool::<AssetListing>(LIST_ASSETS, "List generated assets."),
        ]
    }

    /// Run tool `name` with `arguments` and return its structured result.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, DispatchError> {
        let value = match name {
            GENERATE_IMAGE => outputs(self.studio.text_to_image(args(name, arguments)?).await?),
            TRANSFORM_IMAGE => outputs(self.studio.image_to_image(args(name, arguments)?).await?),
            REMOVE_BACKGROUND => {
                outputs(self.studio.remove_background(args(name, arguments)?).await?)
            }
            UPSCALE_IMAGE => outputs(self.studio.upscale(args(name, arguments)?).await?),
            LIST_MODELS => {
                let page = self.studio.list_models(args(name, arguments)?).await?;
                json!({
                    "models": page.models,
                    "nextPaginationToken": page.next_pagination_token,
                })
            }
            LIST_ASSETS => {
                let page = self.studio.list_assets(args(name, arguments)?).await?;
                json!({
                    "assets": page.assets,
                    "nextPaginationToken": page.next_pagination_token,
                })
            }
            other => return Err(DispatchError::UnknownTool(other.to_owned())),
        };
        Ok(value)
    }

    /// Run a tool for `tools/call`.
    ///
    /// Operation failures become error results so the caller sees the
    /// stage and provider answer. Only an unknown tool or arguments that
    /// do not fit the tool's schema are protocol errors.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = arguments.map(Value::Object).unwrap_or(Value::Null);
        match self.dispatch(name, arguments).await {
            Ok(structured) => {
                let links = links(&structured);
                let mut result = CallToolResult::structured(structured);
                result.content.extend(links);
                Ok(result)
            }
            Err(DispatchError::Job(e)) => {
                tracing::warn!("tool {name} failed at {}: {e}", e.stage().as_str());
                let mut result = CallToolResult::structured_error(failure(&e));
                result.content = vec![Content::text(e.to_string())];
                Ok(result)
            }
            Err(e) => Err(ErrorData::invalid_params(e.to_string(), None)),
        }
    }
}

/// Structured payload describing a failed operation.
pub fn failure(error: &JobError) -> Value {
    let mut detail = serde_json::Map::new();
    match error {
        JobError::Failed { job } => {
            detail.insert("jobId".into(), job.job_id.clone().into());
            if let Some(reason) = job.error_detail() {
                detail.insert("reason".into(), reason.clone());
            }
        }
        JobError::Timeout { job_id, elapsed } => {
            detail.insert("jobId".into(), job_id.clone().into());
            let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            detail.insert("elapsedMs".into(), millis.into());
        }
        JobError::Resolution { failed_id, .. } => {
            detail.insert("failedId".into(), failed_id.clone().into());
        }
        _ => {}
    }
    match error.provider_error() {
        Some(ProviderError::Status { status, body }) => {
            detail.insert("statusCode".into(), (*status).into());
            detail.insert("rawBody".into(), body.clone().into());
        }
        Some(ProviderError::Transport(message)) => {
            detail.insert("transport".into(), message.clone().into());
        }
        Some(other) => {
            detail.insert("cause".into(), other.to_string().into());
        }
        None => {}
    }

    json!({
        "stage": error.stage().as_str(),
        "error": error.to_string(),
        "detail": detail,
    })
}

fn tool<T: JsonSchema>(name: &'static str, description: &'static str) -> Tool {
    let schema = match serde_json::to_value(schema_for!(T)) {
        Ok(Value::Object(schema)) => schema,
        _ => JsonObject::from_iter([("type".to_owned(), json!("object"))]),
    };
    Tool::new(name, description, Arc::new(schema))
}

fn args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, DispatchError> {
    let arguments = match arguments {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|source| DispatchError::InvalidArguments {
        tool: tool.to_owned(),
        source,
    })
}

fn outputs(outputs: Vec<OutputDescriptor>) -> Value {
    json!({ "outputs": outputs })
}

/// A resource link per resolved output.
fn links(structured: &Value) -> Vec<Content> {
    let Some(outputs) = structured.get("outputs").and_then(Value::as_array) else {
        return Vec::new();
    };
    outputs
        .iter()
        .filter_map(|output| {
            let uri = output.get("url")?.as_str()?;
            let name = output.get("id")?.as_str()?;
            Some(Content::resource_link(RawResource::new(uri, name)))
        })
        .collect()
}
