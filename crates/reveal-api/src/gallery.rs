use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use reveal_types::api::{Claims, GalleryPostRequest};
use reveal_types::models::GalleryPost;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, blocking};

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GalleryPostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = blocking(move || state.services.gallery.create(claims.sub, req)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<GalleryPost>>, ApiError> {
    Ok(Json(blocking(move || state.services.gallery.list_all()).await?))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<GalleryPost>>, ApiError> {
    let posts = blocking(move || state.services.gallery.list_by_author(claims.sub)).await?;
    Ok(Json(posts))
}

pub async fn list_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<GalleryPost>>, ApiError> {
    let posts = blocking(move || state.services.gallery.list_for_event(event_id)).await?;
    Ok(Json(posts))
}

pub async fn get(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<GalleryPost>, ApiError> {
    Ok(Json(blocking(move || state.services.gallery.get(post_id)).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    blocking(move || state.services.gallery.delete(post_id, claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}
