use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use reveal_types::api::{Claims, EventRequest, RevealRequest};
use reveal_types::models::EventDetails;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, blocking};

type EventList = Result<Json<Vec<EventDetails>>, ApiError>;

pub async fn list(State(state): State<AppState>) -> EventList {
    Ok(Json(blocking(move || state.services.events.list()).await?))
}

pub async fn list_active(State(state): State<AppState>) -> EventList {
    Ok(Json(blocking(move || state.services.events.list_active()).await?))
}

pub async fn list_open(State(state): State<AppState>) -> EventList {
    Ok(Json(
        blocking(move || state.services.events.list_open_for_voting()).await?,
    ))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> EventList {
    Ok(Json(
        blocking(move || state.services.events.list_by_owner(claims.sub)).await?,
    ))
}

pub async fn get(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventDetails>, ApiError> {
    Ok(Json(blocking(move || state.services.events.get(event_id)).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = blocking(move || state.services.events.create(claims.sub, req)).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EventRequest>,
) -> Result<Json<EventDetails>, ApiError> {
    let event = blocking(move || state.services.events.update(event_id, req, claims.sub)).await?;
    Ok(Json(event))
}

pub async fn reveal(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RevealRequest>,
) -> Result<Json<EventDetails>, ApiError> {
    let event =
        blocking(move || state.services.events.reveal(event_id, req.result, claims.sub)).await?;
    Ok(Json(event))
}

pub async fn close_voting(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<EventDetails>, ApiError> {
    let event = blocking(move || state.services.events.close_voting(event_id, claims.sub)).await?;
    Ok(Json(event))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    blocking(move || state.services.events.delete(event_id, claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}
