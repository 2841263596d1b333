// GET /alerts: static placeholder; not derived from any telemetry.

use axum::response::IntoResponse;
use axum::Json;

use crate::pipeline::alert_stub;

pub async fn get_alerts() -> impl IntoResponse {
    Json(alert_stub())
}
