use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::{config::PublishingSettings, error::ServiceError, publish::SocialPublisher, vendor};

/// Instagram content publishing through the Graph API.
pub struct InstagramClient {
    http: Client,
    settings: PublishingSettings,
}

impl InstagramClient {
    pub fn new(http: Client, settings: PublishingSettings) -> Self {
        Self { http, settings }
    }

    fn endpoint(&self, edge: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.settings.graph_base, self.settings.graph_version, self.settings.account_id, edge
        )
    }

    /// Posts a form to an account edge and returns the `id` of the created
    /// object.
    async fn post_for_id(
        &self,
        edge: &str,
        params: &[(&str, &str)],
        action: &str,
    ) -> Result<String, ServiceError> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("access_token", self.settings.access_token.as_str()));

        let response = self
            .http
            .post(self.endpoint(edge))
            .form(&form)
            .send()
            .await
            .map_err(|err| ServiceError::Publish(format!("{action} request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| {
                ServiceError::Publish(format!("failed reading {action} response: {err}"))
            })?;

        let id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|payload| match payload.get("id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            })
            .filter(|id| !id.is_empty());

        match id {
            Some(id) if status.is_success() => Ok(id),
            _ => Err(ServiceError::Publish(
                vendor::error_message(&body)
                    .filter(|_| !status.is_success() || body.contains("\"error\""))
                    .unwrap_or_else(|| format!("{action} failed (status {status})")),
            )),
        }
    }
}

#[async_trait]
impl SocialPublisher for InstagramClient {
    async fn create_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, ServiceError> {
        let id = self
            .post_for_id(
                "media",
                &[("image_url", image_url), ("caption", caption)],
                "media container creation",
            )
            .await?;
        info!(container_id = %id, "media container created");
        Ok(id)
    }

    async fn publish_container(&self, container_id: &str) -> Result<String, ServiceError> {
        let id = self
            .post_for_id(
                "media_publish",
                &[("creation_id", container_id)],
                "media publish",
            )
            .await?;
        info!(publish_id = %id, "media published");
        Ok(id)
    }
}
