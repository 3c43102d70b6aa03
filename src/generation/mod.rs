mod client;
pub mod styles;
mod types;

use async_trait::async_trait;
use tracing::info;

use crate::error::ServiceError;

pub use client::StabilityClient;
pub use styles::{STYLE_PRESETS, StylePreset};
pub use types::{
    ASPECT_RATIOS, DEFAULT_ASPECT_RATIO, DEFAULT_GUIDANCE, GenerationRequest, GenerationResult,
    TextToImage, clamp_guidance,
};

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, job: &TextToImage) -> Result<GenerationResult, ServiceError>;
}

/// Validates the request, then hands the normalized job to the generator.
/// `None` means the generation credential was not configured.
pub async fn generate_image(
    generator: Option<&dyn ImageGenerator>,
    request: &GenerationRequest,
) -> Result<GenerationResult, ServiceError> {
    let job = request.normalize()?;
    let generator = generator.ok_or_else(|| {
        ServiceError::Configuration(
            "image generation is not configured: STABILITY_API_KEY is missing".into(),
        )
    })?;

    info!(
        style = request.style.as_deref().unwrap_or("none"),
        aspect_ratio = %job.aspect_ratio,
        guidance = job.guidance,
        "requesting image generation"
    );
    generator.generate(&job).await
}
