use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use reveal_types::api::{CastVoteRequest, Claims, UpdateVoteRequest};
use reveal_types::models::Vote;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, blocking};

pub async fn cast(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let vote = blocking(move || state.services.votes.cast(claims.sub, req)).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(vote_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateVoteRequest>,
) -> Result<Json<Vote>, ApiError> {
    let vote = blocking(move || state.services.votes.update(vote_id, claims.sub, req)).await?;
    Ok(Json(vote))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(vote_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    blocking(move || state.services.votes.delete(vote_id, claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get(
    State(state): State<AppState>,
    Path(vote_id): Path<Uuid>,
) -> Result<Json<Vote>, ApiError> {
    Ok(Json(blocking(move || state.services.votes.get(vote_id)).await?))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Vote>>, ApiError> {
    let votes = blocking(move || state.services.votes.list_by_voter(claims.sub)).await?;
    Ok(Json(votes))
}

pub async fn list_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<Vote>>, ApiError> {
    let votes = blocking(move || state.services.votes.list_for_event(event_id)).await?;
    Ok(Json(votes))
}

/// The caller's vote on one event, or 404 when they have not voted.
pub async fn mine_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vote>, ApiError> {
    let vote = blocking(move || {
        state
            .services
            .votes
            .find_for_voter(event_id, claims.sub)?
            .ok_or(reveal_core::CoreError::NotFound("vote"))
    })
    .await?;
    Ok(Json(vote))
}
