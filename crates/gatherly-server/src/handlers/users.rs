use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use gatherly_api::ApiError;
use gatherly_core::{User, now_utc};
use gatherly_storage::{RegistryStore, StorageError};

use crate::state::AppState;

use super::{require_id, require_len};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_id: String,
    pub name: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require_id("userId", &payload.user_id)?;
    require_len("name", &payload.name, 1, 200)?;

    let user = User {
        user_id: payload.user_id,
        name: payload.name,
        created_at: now_utc(),
    };

    let created = state.store.create_user(&user).await.map_err(|err| match err {
        StorageError::AlreadyExists { .. } => ApiError::conflict("User already exists"),
        other => other.into(),
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user))
}
