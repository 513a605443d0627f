mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, Request, header::{AUTHORIZATION, CONTENT_TYPE}};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info, warn};

use reveal_api::media::{CloudinaryHost, MediaHost};
use reveal_api::{AppStateInner, JwtConfig};
use reveal_core::Services;
use reveal_db::Database;
use reveal_mail::NotificationDispatcher;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "reveal=debug,reveal_api=debug,reveal_core=debug,reveal_mail=debug,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e:#}");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);

    if config.mail.default_transport.api_key.is_empty() {
        warn!("REVEAL_MAIL_API_KEY is unset; password reset emails will fail to send");
    }
    let dispatcher = Arc::new(NotificationDispatcher::from_config(&config.mail)?);

    let media: Option<Arc<dyn MediaHost>> = match config.cloudinary.clone() {
        Some(c) => Some(Arc::new(CloudinaryHost::new(c)?)),
        None => {
            warn!("Cloudinary is not configured; media uploads are disabled");
            None
        }
    };

    let state = Arc::new(AppStateInner {
        services: Services::new(db, dispatcher, config.reset_token_ttl),
        media,
        jwt: JwtConfig {
            secret: config.jwt_secret.clone(),
            ttl: config.jwt_ttl,
        },
        max_upload_bytes: config.max_upload_bytes,
    });

    // Base64 upload bodies are a third larger than the decoded payload.
    let app = reveal_api::router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes.saturating_mul(2)))
        .layer(cors(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http().make_span_with(request_span));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Reveal server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Path only: query strings carry reset tokens.
fn request_span(req: &Request<Body>) -> Span {
    tracing::debug_span!("request", method = %req.method(), path = %req.uri().path())
}

fn cors(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed = origins
            .iter()
            .map(|o| HeaderValue::from_str(o))
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
