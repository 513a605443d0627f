use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reveal_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("media uploads are not configured")]
    MediaUnavailable,

    #[error("media host error: {0:#}")]
    Upstream(anyhow::Error),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::Conflict(_) => StatusCode::CONFLICT,
                CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CoreError::VotingClosed => StatusCode::CONFLICT,
                CoreError::Expired => StatusCode::GONE,
                CoreError::InactiveAccount => StatusCode::FORBIDDEN,
                CoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MediaUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("{}", self);
            match self {
                ApiError::MediaUnavailable | ApiError::Upstream(_) => self.to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            if status == StatusCode::FORBIDDEN {
                warn!("{}", self);
            }
            self.to_string()
        };

        (
            status,
            Json(json!({ "error": message, "status": status.as_u16() })),
        )
            .into_response()
    }
}

/// Runs a synchronous core call on the blocking pool.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::from)
}
