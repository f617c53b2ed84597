//! Operation requests.
//!
//! Each request is deserialized from caller input, normalized (numeric
//! knobs clamped into the ranges the API accepts) and turned into a
//! submission body. Normalization happens before submission; the
//! orchestrator never looks at parameters.

use crate::{DeadlineClass, JobError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Largest number of samples one job may produce.
pub const MAX_SAMPLES: u32 = 4;
/// Strength used when img2img omits it.
pub const DEFAULT_STRENGTH: f64 = 0.75;
/// Edge used when a dimension is omitted.
pub const DEFAULT_DIMENSION: u32 = 1024;
/// Page size used when a listing omits it.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A submission-shaped operation.
pub trait Operation {
    /// Endpoint the body is posted to.
    const PATH: &'static str;
    /// Which deadline applies while polling.
    const DEADLINE: DeadlineClass = DeadlineClass::Standard;

    /// Validate, clamp, and build the submission body.
    fn into_body(self) -> Result<Value, JobError>;
}

/// Text to image.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct TextToImage {
    /// Model to generate with.
    pub model_id: String,
    /// What to draw.
    pub prompt: String,
    /// What to avoid.
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// Images to produce, 1 to 4.
    #[serde(default)]
    pub num_samples: Option<u32>,
    /// Output width in pixels, 256 to 2048.
    #[serde(default)]
    pub width: Option<u32>,
    /// Output height in pixels, 256 to 2048.
    #[serde(default)]
    pub height: Option<u32>,
    /// Prompt adherence, 1 to 20.
    #[serde(default)]
    pub guidance: Option<f64>,
    /// Denoising steps, 10 to 150.
    #[serde(default)]
    pub num_inference_steps: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Operation for TextToImage {
    const PATH: &'static str = "/generate/txt2img";

    fn into_body(self) -> Result<Value, JobError> {
        let mut body = Map::new();
        body.insert("modelId".into(), required("model_id", self.model_id)?.into());
        body.insert("prompt".into(), required("prompt", self.prompt)?.into());
        body.insert("numSamples".into(), clamp_samples(self.num_samples).into());
        body.insert("width".into(), clamp_dimension(self.width).into());
        body.insert("height".into(), clamp_dimension(self.height).into());
        put(&mut body, "negativePrompt", non_empty(self.negative_prompt));
        put(&mut body, "guidance", finite(self.guidance).map(|g| g.clamp(1.0, 20.0)));
        put(
            &mut body,
            "numInferenceSteps",
            self.num_inference_steps.map(|s| s.clamp(10, 150)),
        );
        put(&mut body, "seed", self.seed);
        Ok(Value::Object(body))
    }
}

/// Image to image.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ImageToImage {
    /// Model to generate with.
    pub model_id: String,
    /// How to change the source.
    pub prompt: String,
    /// Source asset id or data URL.
    pub image: String,
    /// How far to move away from the source, 0.0 to 1.0.
    #[serde(default)]
    pub strength: Option<f64>,
    /// Images to produce, 1 to 4.
    #[serde(default)]
    pub num_samples: Option<u32>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Operation for ImageToImage {
    const PATH: &'static str = "/generate/img2img";

    fn into_body(self) -> Result<Value, JobError> {
        let mut body = Map::new();
        body.insert("modelId".into(), required("model_id", self.model_id)?.into());
        body.insert("prompt".into(), required("prompt", self.prompt)?.into());
        body.insert("image".into(), required("image", self.image)?.into());
        body.insert("strength".into(), clamp_strength(self.strength).into());
        body.insert("numSamples".into(), clamp_samples(self.num_samples).into());
        put(&mut body, "negativePrompt", non_empty(self.negative_prompt));
        put(&mut body, "seed", self.seed);
        Ok(Value::Object(body))
    }
}

/// Output encoding for background removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

/// Background removal.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct RemoveBackground {
    /// Source asset id or data URL.
    pub image: String,
    #[serde(default)]
    pub format: ImageFormat,
    /// Fill color for the removed area, e.g. `#ffffff`. Transparent when
    /// omitted.
    #[serde(default)]
    pub background_color: Option<String>,
}

impl Operation for RemoveBackground {
    const PATH: &'static str = "/generate/remove-background";

    fn into_body(self) -> Result<Value, JobError> {
        let mut body = Map::new();
        body.insert("image".into(), required("image", self.image)?.into());
        body.insert("format".into(), self.format.as_str().into());
        put(&mut body, "backgroundColor", non_empty(self.background_color));
        Ok(Value::Object(body))
    }
}

/// Upscaling.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct Upscale {
    /// Source asset id or data URL.
    pub image: String,
    /// 2 or 4; other values snap to the nearest.
    #[serde(default)]
    pub scale_factor: Option<u32>,
}

impl Operation for Upscale {
    const PATH: &'static str = "/generate/upscale";
    const DEADLINE: DeadlineClass = DeadlineClass::Heavy;

    fn into_body(self) -> Result<Value, JobError> {
        let mut body = Map::new();
        body.insert("image".into(), required("image", self.image)?.into());
        body.insert("scalingFactor".into(), snap_scale(self.scale_factor).into());
        Ok(Value::Object(body))
    }
}

/// Model visibility filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    Public,
}

/// `GET /models` filter.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ModelListing {
    #[serde(default)]
    pub privacy: Privacy,
    /// 1 to 100.
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl ModelListing {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let privacy = match self.privacy {
            Privacy::Private => "private",
            Privacy::Public => "public",
        };
        vec![
            ("privacy", privacy.to_owned()),
            ("pageSize", clamp_page_size(self.page_size).to_string()),
        ]
    }
}

/// `GET /assets` filter.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct AssetListing {
    /// 1 to 100.
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Asset type, e.g. `inference-txt2img`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl AssetListing {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("pageSize", clamp_page_size(self.page_size).to_string())];
        if let Some(kind) = self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            query.push(("type", kind.to_owned()));
        }
        query
    }
}

/// Sample count, clamped to `[1, MAX_SAMPLES]`. Defaults to 1.
pub fn clamp_samples(samples: Option<u32>) -> u32 {
    samples.unwrap_or(1).clamp(1, MAX_SAMPLES)
}

/// Transformation strength, clamped to `[0, 1]`.
pub fn clamp_strength(strength: Option<f64>) -> f64 {
    finite(strength).unwrap_or(DEFAULT_STRENGTH).clamp(0.0, 1.0)
}

/// Upscale factor, restricted to 2 or 4.
pub fn snap_scale(factor: Option<u32>) -> u32 {
    match factor {
        Some(f) if f >= 3 => 4,
        _ => 2,
    }
}

/// Edge length, clamped to `[256, 2048]` and rounded down to a multiple
/// of 8.
pub fn clamp_dimension(edge: Option<u32>) -> u32 {
    let edge = edge.unwrap_or(DEFAULT_DIMENSION).clamp(256, 2048);
    edge - edge % 8
}

/// Listing page size, clamped to `[1, 100]`.
pub fn clamp_page_size(size: Option<u32>) -> u32 {
    size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100)
}

fn required(field: &str, value: String) -> Result<String, JobError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(JobError::InvalidRequest(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn put(body: &mut Map<String, Value>, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        body.insert(key.to_owned(), value.into());
    }
}
