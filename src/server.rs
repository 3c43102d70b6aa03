use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::Method,
    response::Html,
    routing::{get, post},
};
use reqwest::Client;
use serde::Serialize;
use tokio::time::{Instant, timeout};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    config::AppConfig,
    error::ServiceError,
    generation::{
        self, ASPECT_RATIOS, DEFAULT_ASPECT_RATIO, DEFAULT_GUIDANCE, GenerationRequest,
        GenerationResult, ImageGenerator, STYLE_PRESETS, StabilityClient, StylePreset,
    },
    publish::{
        self, AssetHost, CloudinaryClient, InstagramClient, PublishRequest, PublishResult,
        SocialPublisher,
    },
};

/// Base64 images routinely exceed axum's default 2 MiB body limit.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub generator: Option<Arc<dyn ImageGenerator>>,
    pub host: Option<Arc<dyn AssetHost>>,
    pub publisher: Option<Arc<dyn SocialPublisher>>,
}

impl AppState {
    /// Wires the vendor clients for every credential group that is present.
    /// Each vendor call is capped at `upstream_timeout`, which stays below the
    /// per-request ceiling enforced by the handlers.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.upstream_timeout).build()?;

        let generator = config.generation.clone().map(|settings| {
            Arc::new(StabilityClient::new(http.clone(), settings)) as Arc<dyn ImageGenerator>
        });
        let host = config.hosting.clone().map(|settings| {
            Arc::new(CloudinaryClient::new(http.clone(), settings)) as Arc<dyn AssetHost>
        });
        let publisher = config.publishing.clone().map(|settings| {
            Arc::new(InstagramClient::new(http.clone(), settings)) as Arc<dyn SocialPublisher>
        });

        Ok(Self {
            config,
            generator,
            host,
            publisher,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    generation: bool,
    hosting: bool,
    publishing: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StylesResponse {
    styles: &'static [StylePreset],
    aspect_ratios: &'static [&'static str],
    default_aspect_ratio: &'static str,
    default_guidance: f64,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/styles", get(styles))
        .route("/api/generate", post(generate))
        .route("/api/upload", post(upload))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        generation: state.generator.is_some(),
        hosting: state.host.is_some(),
        publishing: state.publisher.is_some(),
    })
}

async fn styles() -> Json<StylesResponse> {
    Json(StylesResponse {
        styles: STYLE_PRESETS,
        aspect_ratios: ASPECT_RATIOS,
        default_aspect_ratio: DEFAULT_ASPECT_RATIO,
        default_guidance: DEFAULT_GUIDANCE,
    })
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>, ServiceError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let generation = generation::generate_image(state.generator.as_deref(), &request);
    let result = timeout(state.config.request_timeout, generation)
        .await
        .unwrap_or_else(|_| {
            Err(ServiceError::Upstream {
                status: None,
                message: "image generation timed out".into(),
            })
        })
        .inspect_err(|err| warn!(error = %err, "generation failed"))?;
    Ok(Json(result))
}

async fn upload(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResult>, ServiceError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let deadline = Instant::now() + state.config.request_timeout;
    let host = state.host.as_deref();
    let publisher = state.publisher.as_deref();
    let result = publish::publish_image(host, publisher, &request, deadline)
        .await
        .inspect_err(|err| warn!(error = %err, image_url = ?err.image_url(), "upload failed"))?;
    Ok(Json(result))
}

fn invalid_body(rejection: JsonRejection) -> ServiceError {
    ServiceError::Validation(rejection.body_text())
}
