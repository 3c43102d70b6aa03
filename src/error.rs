use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("{0}")]
    Upload(String),
    #[error("{0}")]
    Publish(String),
    /// A failure that happened after the image was already hosted.
    #[error("{source}")]
    AfterHosting {
        image_url: String,
        #[source]
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    pub fn with_image_url(self, image_url: impl Into<String>) -> Self {
        match self {
            already @ ServiceError::AfterHosting { .. } => already,
            other => ServiceError::AfterHosting {
                image_url: image_url.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Upstream { .. } | ServiceError::Upload(_) | ServiceError::Publish(_) => {
                StatusCode::BAD_GATEWAY
            }
            ServiceError::AfterHosting { source, .. } => source.status_code(),
        }
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ServiceError::Upstream { status, .. } => *status,
            ServiceError::AfterHosting { source, .. } => source.upstream_status(),
            _ => None,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            ServiceError::AfterHosting { image_url, .. } => Some(image_url),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut body = Map::new();
        body.insert("error".into(), Value::String(self.to_string()));
        if let Some(upstream) = self.upstream_status() {
            body.insert("status".into(), Value::from(upstream));
        }
        if let Some(url) = self.image_url() {
            body.insert("imageUrl".into(), Value::String(url.to_string()));
        }

        (status, axum::Json(Value::Object(body))).into_response()
    }
}
