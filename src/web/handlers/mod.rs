pub mod alerts;
pub mod detect;
pub mod external;

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::Response;

use crate::telemetry::{csv, TelemetrySeries};
use crate::web::api_error;

/// Multipart field carrying the CSV upload.
pub const UPLOAD_FIELD: &str = "file";

/// Pull the `file` field out of a multipart body and normalize it.
///
/// Any failure becomes a 400 response ready to return.
pub async fn read_csv_upload(mut multipart: Multipart) -> Result<TelemetrySeries, Response> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            &format!("Invalid multipart body: {e}"),
        )
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| {
            api_error(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read upload: {e}"),
            )
        })?;
        return csv::read_series(bytes.as_ref())
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, &format!("{e:#}")));
    }

    Err(api_error(
        StatusCode::BAD_REQUEST,
        "Missing `file` field in multipart upload",
    ))
}
