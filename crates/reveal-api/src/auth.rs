use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use reveal_types::api::{
    AuthResponse, Claims, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, StatusMessage, TokenValidity, VerifyTokenQuery,
};
use reveal_types::models::User;

use crate::AppState;
use crate::error::{ApiError, blocking};

/// Same body whether or not the address is registered.
const RESET_REQUESTED: &str =
    "If this email is registered, you will receive a link to reset your password.";

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let s = state.clone();
    let user = blocking(move || s.services.accounts.register(req)).await?;
    let token = create_token(&state, &user)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let s = state.clone();
    let user = blocking(move || s.services.accounts.login(&req.email, &req.password)).await?;
    let token = create_token(&state, &user)?;

    Ok(Json(AuthResponse { token, user }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    blocking(move || {
        state.services.resets.request_reset(&req.email);
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::ok(RESET_REQUESTED)))
}

pub async fn verify_reset_token(
    State(state): State<AppState>,
    Query(q): Query<VerifyTokenQuery>,
) -> Result<Json<TokenValidity>, ApiError> {
    let valid = blocking(move || state.services.resets.validate(&q.token)).await?;
    Ok(Json(TokenValidity { valid }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    blocking(move || {
        state
            .services
            .resets
            .redeem_and_set_password(&req.token, &req.new_password)
    })
    .await?;

    Ok(Json(StatusMessage::ok("Password has been reset.")))
}

pub fn create_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        exp: (Utc::now() + state.jwt.ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt.secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}
