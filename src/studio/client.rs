use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    generation::{GenerationRequest, GenerationResult},
    publish::{PublishRequest, PublishResult},
    studio::StudioApi,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        image_url: Option<String>,
    },
}

impl ClientError {
    pub fn image_url(&self) -> Option<&str> {
        match self {
            ClientError::Api { image_url, .. } => image_url.as_deref(),
            ClientError::Transport(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: Option<String>,
    image_url: Option<String>,
}

/// HTTP client for the studio's own `/api/generate` and `/api/upload`.
#[derive(Clone)]
pub struct StudioClient {
    http: Client,
    base_url: String,
}

impl StudioClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&text).ok();
        let (message, image_url) = match parsed {
            Some(body) => (body.error, body.image_url),
            None => (None, None),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| format!("request failed with status {status}")),
            image_url,
        })
    }
}

#[async_trait]
impl StudioApi for StudioClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ClientError> {
        self.post("/api/generate", request).await
    }

    async fn upload(&self, request: &PublishRequest) -> Result<PublishResult, ClientError> {
        self.post("/api/upload", request).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn api_error_body_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/upload")
            .with_status(502)
            .with_body(
                json!({"error": "media not ready", "imageUrl": "https://cdn/x.png"}).to_string(),
            )
            .create_async()
            .await;

        let client = StudioClient::new(format!("{}/", server.url()));
        let err = client
            .upload(&PublishRequest {
                image_data: Some("AAAA".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 502, .. }));
        assert_eq!(err.to_string(), "media not ready");
        assert_eq!(err.image_url(), Some("https://cdn/x.png"));
    }

    #[tokio::test]
    async fn success_body_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(json!({"base64Image": "AAAA", "model": "sd3"}).to_string())
            .create_async()
            .await;

        let result = StudioClient::new(server.url())
            .generate(&GenerationRequest {
                prompt: Some("pose".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.base64_image, "AAAA");
        assert_eq!(result.model.as_deref(), Some("sd3"));
        assert_eq!(result.inference_time, None);
    }
}
