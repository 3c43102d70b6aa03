use serde::{Deserialize, Serialize};

use crate::{error::ServiceError, generation::styles};

pub const DEFAULT_GUIDANCE: f64 = 7.5;
pub const MIN_GUIDANCE: f64 = 1.0;
pub const MAX_GUIDANCE: f64 = 20.0;
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

/// Aspect ratios the form offers. Requests are not checked against this list.
pub const ASPECT_RATIOS: &[&str] = &[
    "1:1", "16:9", "21:9", "2:3", "3:2", "4:5", "5:4", "9:16", "9:21",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub base64_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_time: Option<f64>,
}

/// The vendor-facing request after defaults, clamping and style resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TextToImage {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub aspect_ratio: String,
    pub guidance: f64,
}

impl GenerationRequest {
    pub fn normalize(&self) -> Result<TextToImage, ServiceError> {
        let prompt = self
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::Validation("prompt is required".into()))?;

        let negative_prompt = self
            .negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let aspect_ratio = self
            .aspect_ratio
            .clone()
            .unwrap_or_else(|| DEFAULT_ASPECT_RATIO.to_string());

        Ok(TextToImage {
            prompt: styles::apply(prompt, self.style.as_deref()),
            negative_prompt,
            aspect_ratio,
            guidance: clamp_guidance(self.guidance),
        })
    }
}

pub fn clamp_guidance(guidance: Option<f64>) -> f64 {
    match guidance {
        Some(value) if value.is_finite() => value.clamp(MIN_GUIDANCE, MAX_GUIDANCE),
        _ => DEFAULT_GUIDANCE,
    }
}
