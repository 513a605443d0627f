use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use reveal_types::api::{ChangePasswordRequest, Claims, StatusMessage, UpdateProfileRequest};
use reveal_types::models::User;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, blocking};

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let user = blocking(move || state.services.accounts.current_user(claims.sub)).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let user = blocking(move || state.services.accounts.update_profile(claims.sub, req)).await?;
    Ok(Json(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    blocking(move || {
        state
            .services
            .accounts
            .change_password(claims.sub, &req.current_password, &req.new_password)
    })
    .await?;
    Ok(Json(StatusMessage::ok("Password changed.")))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = blocking(move || state.services.accounts.list_users(claims.sub)).await?;
    Ok(Json(users))
}

pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = blocking(move || state.services.accounts.get_user(user_id)).await?;
    Ok(Json(user))
}

pub async fn deactivate(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    blocking(move || state.services.accounts.deactivate(user_id, claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}
