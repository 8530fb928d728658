pub mod config;
pub mod error;
pub mod validation;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{Html, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use htmd::options::{HeadingStyle, Options};
use htmd::HtmlToMarkdown;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tts_core::{StopStatus, TtsService};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::validation::validate_tts_request;

pub const ADMISSION_HEADER: &str = "x-tts-admission";

static INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    pub tts: Arc<TtsService>,
    pub config: ServerConfig,
}

#[derive(Deserialize)]
pub struct TtsQuery {
    text: String,
    #[serde(default = "default_speed")]
    speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

#[derive(Serialize, Deserialize)]
pub struct StopResponse {
    pub status: StopStatus,
}

#[derive(Deserialize)]
pub struct HtmlContent {
    html: String,
}

#[derive(Serialize)]
pub struct MarkdownResponse {
    markdown: String,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .into_inner();

    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/tts", get(tts_stream))
        .route("/stop", post(stop_tts))
        .route("/html_to_markdown", post(html_to_markdown))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .flatten()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        if config.cors_allowed_origins.is_some() {
            warn!("CORS_ALLOWED_ORIGINS has no valid origin, falling back to permissive CORS");
        }
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(tower_http::cors::AllowOrigin::list(origins))
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &value {
        request.headers_mut().insert("x-request-id", value.clone());
    }
    let mut response = next.run(request).await;
    if let Some(value) = value {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Stream synthesized speech as a WAV body while it is being produced.
pub async fn tts_stream(
    State(state): State<AppState>,
    Query(query): Query<TtsQuery>,
) -> Result<Response, ApiError> {
    validate_tts_request(&query.text, query.speed)?;

    let ticket = state
        .tts
        .begin_stream(&query.text, query.speed)
        .map_err(ApiError::StreamStart)?;
    info!(
        stream_id = %ticket.handler.id(),
        admission = ticket.admission.as_str(),
        speed = query.speed,
        "Streaming audio"
    );

    let chunks = ticket
        .handler
        .stream_chunks(true)
        .map(Ok::<_, Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/wav")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(ADMISSION_HEADER, ticket.admission.as_str())
        .body(Body::from_stream(chunks))
        .map_err(ApiError::from)
}

pub async fn stop_tts(State(state): State<AppState>) -> Json<StopResponse> {
    let status = state.tts.stop_current();
    info!(?status, "Stop requested");
    Json(StopResponse { status })
}

pub async fn html_to_markdown(
    Json(content): Json<HtmlContent>,
) -> Result<Json<MarkdownResponse>, ApiError> {
    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            ..Default::default()
        })
        .build();

    let markdown = converter
        .convert(&content.html)
        .map_err(|e| ApiError::Conversion(e.to_string()))?;

    Ok(Json(MarkdownResponse { markdown }))
}
