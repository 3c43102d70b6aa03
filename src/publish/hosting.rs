use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{config::HostingSettings, error::ServiceError, publish::AssetHost, vendor};

/// Signed uploads against the Cloudinary upload API.
pub struct CloudinaryClient {
    http: Client,
    settings: HostingSettings,
}

impl CloudinaryClient {
    pub fn new(http: Client, settings: HostingSettings) -> Self {
        Self { http, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.settings.api_base, self.settings.cloud_name
        )
    }
}

/// Cloudinary request signature: the signed parameters sorted by name,
/// joined as `k=v` pairs with `&`, the secret appended, hashed with SHA-256.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn data_uri(image_data: &str) -> String {
    let trimmed = image_data.trim();
    if trimmed.starts_with("data:") {
        trimmed.to_string()
    } else {
        format!("data:image/png;base64,{trimmed}")
    }
}

#[async_trait]
impl AssetHost for CloudinaryClient {
    async fn upload(&self, image_data: &str) -> Result<String, ServiceError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.settings.api_secret);

        let form = [
            ("file", data_uri(image_data)),
            ("api_key", self.settings.api_key.clone()),
            ("timestamp", timestamp),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response = self
            .http
            .post(self.endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|err| ServiceError::Upload(format!("image hosting request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| {
                ServiceError::Upload(format!("failed reading hosting response: {err}"))
            })?;

        if !status.is_success() {
            return Err(ServiceError::Upload(vendor::error_message(&body).unwrap_or_else(
                || format!("image hosting failed with status {status}"),
            )));
        }

        let url = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|payload| {
                payload
                    .get("secure_url")
                    .or_else(|| payload.get("url"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ServiceError::Upload("image hosting returned no URL".into()))?;

        info!(%url, "image hosted");
        Ok(url)
    }
}
