mod caption;
mod graph;
mod hosting;
mod types;

use async_trait::async_trait;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

use crate::error::ServiceError;

pub use caption::{HASHTAGS, compose_caption};
pub use graph::InstagramClient;
pub use hosting::{CloudinaryClient, sign};
pub use types::{PublishRequest, PublishResult};

/// Turns a base64 image into a durable public URL.
#[async_trait]
pub trait AssetHost: Send + Sync {
    async fn upload(&self, image_data: &str) -> Result<String, ServiceError>;
}

/// Two-step container/publish flow of a social graph API.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    async fn create_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, ServiceError>;
    async fn publish_container(&self, container_id: &str) -> Result<String, ServiceError>;
}

const HOSTING_MISSING: &str = "image hosting is not configured: CLOUDINARY_CLOUD_NAME, \
    CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET are required";
const PUBLISHING_MISSING: &str =
    "publishing is not configured: INSTAGRAM_ACCESS_TOKEN and INSTAGRAM_ACCOUNT_ID are required";

/// Hosts the image, then publishes it, all before `deadline`. Any failure
/// after hosting succeeded, including running out of time, carries the
/// hosted URL.
pub async fn publish_image(
    host: Option<&dyn AssetHost>,
    publisher: Option<&dyn SocialPublisher>,
    request: &PublishRequest,
    deadline: Instant,
) -> Result<PublishResult, ServiceError> {
    let image_data = request
        .image_data
        .as_deref()
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ServiceError::Validation("imageData is required".into()))?;

    let host = host.ok_or_else(|| ServiceError::Configuration(HOSTING_MISSING.into()))?;
    let image_url = timeout_at(deadline, host.upload(image_data))
        .await
        .map_err(|_| ServiceError::Upload("image hosting timed out".into()))??;

    let steps = async {
        let publisher =
            publisher.ok_or_else(|| ServiceError::Configuration(PUBLISHING_MISSING.into()))?;
        let caption = compose_caption(
            request.caption.as_deref(),
            request.prompt.as_deref(),
            request.style.as_deref(),
        );
        let container_id = publisher.create_container(&image_url, &caption).await?;
        let publish_id = publisher.publish_container(&container_id).await?;
        Ok::<_, ServiceError>((container_id, publish_id))
    };
    let outcome = timeout_at(deadline, steps)
        .await
        .unwrap_or_else(|_| Err(ServiceError::Publish("publishing timed out".into())));

    match outcome {
        Ok((container_id, publish_id)) => {
            info!(%image_url, %container_id, %publish_id, "image published");
            Ok(PublishResult {
                container_id,
                publish_id,
                image_url,
            })
        }
        Err(err) => {
            warn!(%image_url, error = %err, "publish failed after hosting");
            Err(err.with_image_url(image_url))
        }
    }
}
