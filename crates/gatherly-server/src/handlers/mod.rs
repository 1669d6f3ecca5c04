use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use gatherly_api::ApiError;

pub mod events;
pub mod registrations;
pub mod users;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Gatherly Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

/// Validates a client-supplied identifier for path/body use.
pub(crate) fn require_id(field: &'static str, value: &str) -> Result<(), ApiError> {
    gatherly_core::validate_id(value)
        .map_err(|e| ApiError::bad_request(format!("Invalid {field}: {e}")))
}

/// Validates a required text field against the accepted length range.
pub(crate) fn require_len(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ApiError> {
    if value.len() < min || value.len() > max {
        return Err(ApiError::bad_request(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

/// Validates an optional text field against a maximum length.
pub(crate) fn limit_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ApiError> {
    if let Some(value) = value
        && value.len() > max
    {
        return Err(ApiError::bad_request(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Validates an event capacity against the accepted range.
pub(crate) fn require_capacity(capacity: u32) -> Result<(), ApiError> {
    if capacity == 0 || capacity > 100_000 {
        return Err(ApiError::bad_request(
            "capacity must be between 1 and 100000",
        ));
    }
    Ok(())
}
