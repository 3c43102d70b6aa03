use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, header::ACCEPT, multipart::Form};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    config::GenerationSettings,
    error::ServiceError,
    generation::{GenerationResult, ImageGenerator, TextToImage},
    vendor,
};

/// Text-to-image client for the Stability REST API.
pub struct StabilityClient {
    http: Client,
    settings: GenerationSettings,
}

impl StabilityClient {
    pub fn new(http: Client, settings: GenerationSettings) -> Self {
        Self { http, settings }
    }

    fn endpoint(&self) -> String {
        format!("{}/v2beta/stable-image/generate/sd3", self.settings.api_base)
    }

    fn form(&self, job: &TextToImage) -> Form {
        let mut form = Form::new()
            .text("prompt", job.prompt.clone())
            .text("aspect_ratio", job.aspect_ratio.clone())
            .text("cfg_scale", job.guidance.to_string())
            .text("output_format", "png");
        if let Some(negative) = &job.negative_prompt {
            form = form.text("negative_prompt", negative.clone());
        }
        if let Some(model) = &self.settings.model {
            form = form.text("model", model.clone());
        }
        form
    }
}

#[async_trait]
impl ImageGenerator for StabilityClient {
    async fn generate(&self, job: &TextToImage) -> Result<GenerationResult, ServiceError> {
        let endpoint = self.endpoint();
        let started = Instant::now();

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.settings.api_key)
            .header(ACCEPT, "application/json")
            .multipart(self.form(job))
            .send()
            .await
            .map_err(|err| ServiceError::Upstream {
                status: None,
                message: format!("image generation request failed: {err}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| ServiceError::Upstream {
            status: Some(status.as_u16()),
            message: format!("failed reading image generation response: {err}"),
        })?;
        debug!(
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "image generation responded"
        );

        if !status.is_success() {
            return Err(ServiceError::Upstream {
                status: Some(status.as_u16()),
                message: vendor::error_message(&body)
                    .unwrap_or_else(|| format!("image generation failed with status {status}")),
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|_| ServiceError::Upstream {
            status: Some(status.as_u16()),
            message: "image generation returned a non-JSON response".into(),
        })?;
        let result = parse_artifact(&payload).ok_or_else(|| ServiceError::Upstream {
            status: Some(status.as_u16()),
            message: "image generation response contained no image".into(),
        })?;

        info!(
            model = result.model.as_deref().unwrap_or("default"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "image generated"
        );
        Ok(result)
    }
}

fn parse_artifact(payload: &Value) -> Option<GenerationResult> {
    let image = payload
        .get("image")
        .or_else(|| payload.get("base64"))
        .or_else(|| {
            payload
                .get("artifacts")
                .and_then(Value::as_array)
                .and_then(|rows| rows.first())
                .and_then(|row| row.get("base64"))
        })
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())?;

    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string);
    let inference_time = payload
        .get("inference_time")
        .or_else(|| payload.get("inferenceTime"))
        .and_then(Value::as_f64);

    Some(GenerationResult {
        base64_image: image.to_string(),
        model,
        inference_time,
    })
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn client(base: String) -> StabilityClient {
        StabilityClient::new(
            Client::new(),
            GenerationSettings {
                api_key: "sk-test".into(),
                api_base: base,
                model: Some("sd3-medium".into()),
            },
        )
    }

    fn job() -> TextToImage {
        TextToImage {
            prompt: "a figure sketch".into(),
            negative_prompt: Some("text".into()),
            aspect_ratio: "2:3".into(),
            guidance: 7.5,
        }
    }

    #[test]
    fn parses_supported_artifact_shapes() {
        let direct = parse_artifact(&json!({"image": "AAA", "model": "sd3", "inference_time": 1.5}))
            .unwrap();
        assert_eq!(direct.base64_image, "AAA");
        assert_eq!(direct.model.as_deref(), Some("sd3"));
        assert_eq!(direct.inference_time, Some(1.5));

        let listed = parse_artifact(&json!({"artifacts": [{"base64": "BBB", "seed": 1}]})).unwrap();
        assert_eq!(listed.base64_image, "BBB");
        assert_eq!(listed.model, None);

        assert!(parse_artifact(&json!({"artifacts": []})).is_none());
        assert!(parse_artifact(&json!({"image": ""})).is_none());
    }

    #[tokio::test]
    async fn sends_authorized_multipart_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2beta/stable-image/generate/sd3")
            .match_header("authorization", "Bearer sk-test")
            .match_header("accept", "application/json")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("a figure sketch".into()),
                Matcher::Regex("name=\"aspect_ratio\"".into()),
                Matcher::Regex("name=\"negative_prompt\"".into()),
                Matcher::Regex("sd3-medium".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"image": "iVBORw0KGgo=", "finish_reason": "SUCCESS"}).to_string())
            .create_async()
            .await;

        let result = client(server.url()).generate(&job()).await.unwrap();
        assert_eq!(result.base64_image, "iVBORw0KGgo=");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn vendor_failure_carries_status_and_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2beta/stable-image/generate/sd3")
            .with_status(402)
            .with_body(
                json!({"name": "payment_required", "errors": ["insufficient credits"]})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = client(server.url()).generate(&job()).await.unwrap_err();
        match err {
            ServiceError::Upstream { status, message } => {
                assert_eq!(status, Some(402));
                assert_eq!(message, "insufficient credits");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_without_artifact_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2beta/stable-image/generate/sd3")
            .with_status(200)
            .with_body(json!({"finish_reason": "CONTENT_FILTERED"}).to_string())
            .create_async()
            .await;

        let err = client(server.url()).generate(&job()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream { .. }));
        assert!(err.to_string().contains("no image"));
    }
}
