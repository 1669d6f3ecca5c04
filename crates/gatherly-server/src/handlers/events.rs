use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use time::Date;

use gatherly_api::ApiError;
use gatherly_core::{Event, EventStatus, generate_id, model::iso_date};
use gatherly_storage::{EventPatch, RegistryStore, StorageError};

use crate::state::AppState;

use super::{limit_len, require_capacity, require_id, require_len};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub event_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub location: String,
    pub capacity: u32,
    pub organizer: String,
    pub status: EventStatus,
    #[serde(default)]
    pub waitlist_enabled: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "optional_iso_date")]
    pub date: Option<Date>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub status: Option<EventStatus>,
    #[serde(default)]
    pub waitlist_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EventListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    if let Some(ref event_id) = payload.event_id {
        require_id("eventId", event_id)?;
    }
    require_len("title", &payload.title, 1, 200)?;
    limit_len("description", payload.description.as_deref(), 2000)?;
    require_len("location", &payload.location, 1, 500)?;
    require_len("organizer", &payload.organizer, 1, 200)?;
    require_capacity(payload.capacity)?;

    let event = Event {
        event_id: payload.event_id.unwrap_or_else(generate_id),
        title: payload.title,
        description: payload.description,
        date: payload.date,
        location: payload.location,
        capacity: payload.capacity,
        organizer: payload.organizer,
        status: payload.status,
        waitlist_enabled: payload.waitlist_enabled,
        confirmed_count: 0,
    };

    let record = state
        .store
        .create_event(&event)
        .await
        .map_err(|err| match err {
            StorageError::AlreadyExists { .. } => ApiError::conflict("Event already exists"),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(record.event)))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let status = parse_status_filter(query.status.as_deref())?;
    let records = state.store.list_events(status).await?;
    Ok(Json(records.into_iter().map(|r| r.event).collect()))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let record = state
        .store
        .get_event(&event_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;
    Ok(Json(record.event))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    if let Some(ref title) = payload.title {
        require_len("title", title, 1, 200)?;
    }
    limit_len("description", payload.description.as_deref(), 2000)?;
    if let Some(ref location) = payload.location {
        require_len("location", location, 1, 500)?;
    }
    if let Some(ref organizer) = payload.organizer {
        require_len("organizer", organizer, 1, 200)?;
    }
    if let Some(capacity) = payload.capacity {
        require_capacity(capacity)?;
    }

    let patch = EventPatch {
        title: payload.title,
        description: payload.description,
        date: payload.date,
        location: payload.location,
        capacity: payload.capacity,
        organizer: payload.organizer,
        status: payload.status,
        waitlist_enabled: payload.waitlist_enabled,
    };

    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let record = state
        .store
        .update_event(&event_id, &patch)
        .await
        .map_err(|err| match err {
            StorageError::NotFound { .. } => ApiError::not_found("Event not found"),
            other => other.into(),
        })?;

    Ok(Json(record.event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .delete_event(&event_id)
        .await
        .map_err(|err| match err {
            StorageError::NotFound { .. } => ApiError::not_found("Event not found"),
            other => other.into(),
        })?;
    Ok(Json(json!({ "message": "Event deleted" })))
}

pub(crate) fn parse_status_filter(status: Option<&str>) -> Result<Option<EventStatus>, ApiError> {
    status
        .map(|s| {
            s.parse::<EventStatus>()
                .map_err(|e| ApiError::bad_request(e.to_string()))
        })
        .transpose()
}

/// Serde support for optional ISO dates in partial updates.
mod optional_iso_date {
    use gatherly_core::model::iso_date;
    use serde::{Deserialize, Deserializer};
    use time::Date;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "iso_date")] Date);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}
