pub mod auth;
pub mod error;
pub mod events;
pub mod gallery;
pub mod media;
pub mod middleware;
pub mod users;
pub mod votes;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post, put},
};
use reveal_core::Services;
use serde_json::{Value, json};

use crate::media::MediaHost;

pub type AppState = Arc<AppStateInner>;

pub struct JwtConfig {
    pub secret: String,
    pub ttl: chrono::Duration,
}

pub struct AppStateInner {
    pub services: Services,
    /// `None` when no media host is configured; uploads then answer 503.
    pub media: Option<Arc<dyn MediaHost>>,
    pub jwt: JwtConfig,
    pub max_upload_bytes: usize,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// All routes, with bearer auth on everything outside the public set.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password/verify", get(auth::verify_reset_token))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/events", get(events::list))
        .route("/events/active", get(events::list_active))
        .route("/events/open", get(events::list_open))
        .route("/events/{event_id}", get(events::get))
        .route("/events/{event_id}/votes", get(votes::list_for_event))
        .route("/events/{event_id}/gallery", get(gallery::list_for_event))
        .route("/votes/{vote_id}", get(votes::get))
        .route("/gallery", get(gallery::list))
        .route("/gallery/{post_id}", get(gallery::get));

    let protected_routes = Router::new()
        .route("/users", get(users::list))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users/me/password", post(users::change_password))
        .route("/users/{user_id}", get(users::get).delete(users::deactivate))
        .route("/events", post(events::create))
        .route("/events/mine", get(events::list_mine))
        .route("/events/{event_id}", put(events::update).delete(events::delete))
        .route("/events/{event_id}/reveal", put(events::reveal))
        .route("/events/{event_id}/close-voting", put(events::close_voting))
        .route("/events/{event_id}/votes/mine", get(votes::mine_for_event))
        .route("/votes", post(votes::cast))
        .route("/votes/mine", get(votes::list_mine))
        .route("/votes/{vote_id}", put(votes::update).delete(votes::delete))
        .route("/gallery", post(gallery::create))
        .route("/gallery/mine", get(gallery::list_mine))
        .route("/gallery/{post_id}", axum::routing::delete(gallery::delete))
        .route("/media/images", post(media::upload_image))
        .route("/media/images/base64", post(media::upload_image_base64))
        .route("/media/videos", post(media::upload_video))
        .route("/media/{kind}/{handle}", axum::routing::delete(media::delete))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
