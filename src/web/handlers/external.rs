// External feed routes.
//
// GET /external/donki: DONKI CME list for the last week, proxied
// GET /external/cactus: CACTus latest CME, proxied
// GET /external/plasma/detect: SWPC real-time plasma run through the pipeline
//
// Upstream failures map to 502 so callers can tell them apart from our own errors.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::feeds::swpc::parse_plasma_table;
use crate::feeds::SpaceWeatherFeed;
use crate::web::{api_error, AppState};

async fn proxy(feed: Arc<dyn SpaceWeatherFeed>) -> Response {
    match feed.latest().await {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            tracing::warn!(feed = feed.name(), error = %e, "Upstream feed failed");
            api_error(
                StatusCode::BAD_GATEWAY,
                &format!("{} feed unavailable", feed.name()),
            )
        }
    }
}

pub async fn donki(State(state): State<AppState>) -> Response {
    proxy(state.donki.clone()).await
}

pub async fn cactus(State(state): State<AppState>) -> Response {
    proxy(state.cactus.clone()).await
}

pub async fn plasma_detect(State(state): State<AppState>) -> Response {
    let value = match state.plasma.latest().await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(feed = state.plasma.name(), error = %e, "Upstream feed failed");
            return api_error(StatusCode::BAD_GATEWAY, "plasma feed unavailable");
        }
    };

    match parse_plasma_table(&value) {
        Ok(series) => Json(state.pipeline.detect(&series)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Unexpected plasma payload");
            api_error(StatusCode::BAD_GATEWAY, "plasma feed returned an unexpected payload")
        }
    }
}
