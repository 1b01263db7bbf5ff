//! Umbrella API: REST endpoints over the moderation pipeline
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use umbrella_inference::{ChatCompletionsClient, InferenceClient};
use umbrella_prompts::{PromptBuilder, PromptError, TemplatesFile};
use umbrella_registry::SchemaRegistry;
use umbrella_stages::ModerationService;

pub use config::{ServerConfig, DEFAULT_LOG_FILTER, DEFAULT_MAX_BODY_BYTES};
pub use error::{ApiError, StartupError};
pub use metrics::ApiMetrics;

/// Shared per-process state; every field is immutable or internally atomic
#[derive(Clone)]
pub struct AppState {
    pub service: ModerationService,
    pub metrics: Arc<ApiMetrics>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(service: ModerationService) -> Result<Self, StartupError> {
        Ok(Self {
            service,
            metrics: Arc::new(ApiMetrics::new()?),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Wire the HTTP inference client and prompt set described by `config`
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let templates = match &config.prompts_path {
            Some(path) => TemplatesFile::load(&path.to_string_lossy())?,
            None => TemplatesFile::embedded()?,
        };
        let prompts = PromptBuilder::new(
            SchemaRegistry::standard().map_err(PromptError::from)?,
            config.models.clone(),
            templates,
        )?;
        let client: Arc<dyn InferenceClient> = Arc::new(ChatCompletionsClient::new(
            config.inference.endpoint.clone(),
            config.inference.api_key.clone(),
        ));
        Ok(Self::new(ModerationService::new(Arc::new(prompts), client))?
            .with_max_body_bytes(config.max_body_bytes))
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/api/moderate-text", post(handlers::moderate_text))
        .route("/api/analyze-image", post(handlers::analyze_image))
        .route("/api/analyze-voice", post(handlers::analyze_voice))
        .route("/api/detect-deepfake", post(handlers::detect_deepfake))
        .route("/api/chat", post(handlers::chat))
        .route("/api/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::access_log))
                .layer(middleware::cors()),
        )
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let state = AppState::from_config(&config)?;
    if !state.service.is_configured() {
        tracing::warn!(
            endpoint = %config.inference.endpoint,
            "no inference credential; analysis requests will fail until GROQ_API_KEY is set"
        );
    }

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;

    tracing::info!("Umbrella API listening on {}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}
