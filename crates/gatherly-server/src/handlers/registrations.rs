use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use gatherly_api::ApiError;
use gatherly_core::{Registration, RegistrationStatus};

use crate::state::AppState;

use super::require_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct RegistrationListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    require_id("userId", &payload.user_id)?;

    let registration = state
        .registrations
        .register(&event_id, &payload.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn unregister(
    State(state): State<AppState>,
    Path((event_id, user_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state.registrations.unregister(&event_id, &user_id).await?;
    Ok(Json(json!({ "message": "Unregistered successfully" })))
}

pub async fn list_event_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<RegistrationListQuery>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<RegistrationStatus>()
                .map_err(|e| ApiError::bad_request(e.to_string()))
        })
        .transpose()?;

    let registrations = state
        .registrations
        .list_event_registrations(&event_id, status)
        .await?;
    Ok(Json(registrations))
}

pub async fn list_user_registrations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let registrations = state
        .registrations
        .list_user_registrations(&user_id)
        .await?;
    Ok(Json(registrations))
}
