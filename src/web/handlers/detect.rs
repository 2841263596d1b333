// POST /detect: full DetectionResult for an uploaded CSV.
// POST /forecast: forecast view (eta_hours, message) for the same input.

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::read_csv_upload;
use crate::web::AppState;

pub async fn detect(State(state): State<AppState>, multipart: Multipart) -> Response {
    match read_csv_upload(multipart).await {
        Ok(series) => Json(state.pipeline.detect(&series)).into_response(),
        Err(response) => response,
    }
}

pub async fn forecast(State(state): State<AppState>, multipart: Multipart) -> Response {
    match read_csv_upload(multipart).await {
        Ok(series) => Json(state.pipeline.forecast(&series)).into_response(),
        Err(response) => response,
    }
}
