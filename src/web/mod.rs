// Web server: Axum-based HTTP surface over the detection pipeline.
//
// Uploads arrive as multipart CSV, are normalized into a TelemetrySeries,
// and go straight through the pipeline. External feeds are proxied as JSON.
// There is no auth and no persisted state; every request stands alone.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::feeds::cactus::CactusClient;
use crate::feeds::donki::DonkiClient;
use crate::feeds::swpc::SwpcPlasmaClient;
use crate::feeds::SpaceWeatherFeed;
use crate::pipeline::Pipeline;

pub mod handlers;

/// Uploads larger than this are rejected before parsing.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub donki: Arc<dyn SpaceWeatherFeed>,
    pub cactus: Arc<dyn SpaceWeatherFeed>,
    pub plasma: Arc<dyn SpaceWeatherFeed>,
}

impl AppState {
    /// Build state from configuration, constructing the real feed clients.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            pipeline: Arc::new(Pipeline::new(config.pipeline)?),
            donki: Arc::new(DonkiClient::new(&config.donki_url, &config.donki_api_key)?),
            cactus: Arc::new(CactusClient::new(&config.cactus_url)?),
            plasma: Arc::new(SwpcPlasmaClient::new(&config.swpc_plasma_url)?),
        })
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(config: Config, port: u16, bind: &str) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("cmewatch API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/detect", post(handlers::detect::detect))
        .route("/forecast", post(handlers::detect::forecast))
        .route("/alerts", get(handlers::alerts::get_alerts))
        .route("/external/donki", get(handlers::external::donki))
        .route("/external/cactus", get(handlers::external::cactus))
        .route("/external/plasma/detect", get(handlers::external::plasma_detect))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check: always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
