//! Photo and video uploads, stored on Cloudinary.
//!
//! Clients get back a public URL plus a deletion handle, which is the URL-safe
//! base64 of the Cloudinary `public_id` so it fits in one path segment. Every
//! upload is recorded against its uploader, and only the uploader or an admin
//! may delete it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::Utc;
use reveal_types::api::{Base64UploadRequest, Claims, UploadResponse};
use reveal_types::models::MediaKind;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{ApiError, blocking};

fn accepts(kind: MediaKind, mime: &str) -> bool {
    mime == "application/octet-stream" || mime.starts_with(&format!("{}/", kind.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, kind: MediaKind, mime: &str, data: Vec<u8>) -> anyhow::Result<StoredMedia>;

    /// Returns false when the host had nothing stored under `public_id`.
    async fn delete(&self, kind: MediaKind, public_id: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: Option<String>,
}

pub struct CloudinaryHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResult {
    result: String,
}

/// Cloudinary request signature: SHA-1 over the sorted `key=value` pairs
/// joined with `&`, followed by the API secret. `file` and `api_key` are
/// not signed.
fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha1::digest(format!("{joined}{secret}").as_bytes()))
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("building Cloudinary HTTP client")?;
        Ok(Self {
            base_url: format!("https://api.cloudinary.com/v1_1/{}", config.cloud_name),
            client,
            config,
        })
    }

    async fn signed_post<T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        mut params: Vec<(&str, String)>,
        file: Option<String>,
    ) -> anyhow::Result<T> {
        let timestamp = Utc::now().timestamp().to_string();
        params.push(("timestamp", timestamp));
        let signed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let signature = sign(&signed, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        if let Some(file) = file {
            params.push(("file", file));
        }

        let resp = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .with_context(|| format!("Cloudinary unreachable at {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            bail!("Cloudinary returned {}: {}", status, detail);
        }
        resp.json().await.context("decoding Cloudinary response")
    }
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, kind: MediaKind, mime: &str, data: Vec<u8>) -> anyhow::Result<StoredMedia> {
        let url = format!("{}/{}/upload", self.base_url, kind.as_str());
        let mut params = Vec::new();
        if let Some(folder) = &self.config.folder {
            params.push(("folder", folder.clone()));
        }

        // Cloudinary accepts a data URI as the file.
        let file = format!("data:{};base64,{}", mime, STANDARD.encode(&data));
        let result: UploadResult = self.signed_post(url, params, Some(file)).await?;
        Ok(StoredMedia {
            url: result.secure_url,
            public_id: result.public_id,
        })
    }

    async fn delete(&self, kind: MediaKind, public_id: &str) -> anyhow::Result<bool> {
        let url = format!("{}/{}/destroy", self.base_url, kind.as_str());
        let result: DestroyResult = self
            .signed_post(url, vec![("public_id", public_id.to_string())], None)
            .await?;
        match result.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            other => bail!("unexpected Cloudinary destroy result: {other}"),
        }
    }
}

pub fn encode_handle(public_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(public_id)
}

pub fn decode_handle(handle: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(handle).ok()?;
    String::from_utf8(bytes).ok().filter(|id| !id.is_empty())
}

/// Splits `data:<mime>;base64,<payload>`; bare base64 is taken as an image
/// of unknown type.
fn parse_data_uri(input: &str) -> Result<(String, Vec<u8>), ApiError> {
    let input = input.trim();
    let (mime, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| ApiError::BadRequest("malformed data URI".into()))?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| ApiError::BadRequest("data URI must be base64 encoded".into()))?;
            (mime.to_string(), payload)
        }
        None => ("application/octet-stream".to_string(), input),
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| ApiError::BadRequest("invalid base64 payload".into()))?;
    Ok((mime, bytes))
}

fn host(state: &AppState) -> Result<Arc<dyn MediaHost>, ApiError> {
    state.media.clone().ok_or(ApiError::MediaUnavailable)
}

async fn store(
    state: &AppState,
    claims: &Claims,
    kind: MediaKind,
    mime: &str,
    data: Vec<u8>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    if data.is_empty() {
        return Err(ApiError::BadRequest("empty upload".into()));
    }
    if data.len() > state.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(state.max_upload_bytes));
    }
    if !accepts(kind, mime) {
        return Err(ApiError::BadRequest(format!(
            "{mime} is not a valid {} type",
            kind.as_str()
        )));
    }

    let size = data.len();
    let host = host(state)?;
    let stored = host
        .upload(kind, mime, data)
        .await
        .map_err(ApiError::Upstream)?;

    let s = state.clone();
    let (owner_id, public_id, url) = (claims.sub, stored.public_id.clone(), stored.url.clone());
    let recorded =
        blocking(move || s.services.media.record(owner_id, kind, &public_id, &url)).await;
    if let Err(e) = recorded {
        if let Err(cleanup) = host.delete(kind, &stored.public_id).await {
            warn!(user_id = %claims.sub, "Unrecorded upload left on media host: {:#}", cleanup);
        }
        return Err(e);
    }
    info!(user_id = %claims.sub, kind = kind.as_str(), size, "Media uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: stored.url,
            delete_handle: encode_handle(&stored.public_id),
        }),
    ))
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// POST /media/images: raw image bytes in the body.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    store(&state, &claims, MediaKind::Image, &content_type(&headers), bytes.to_vec()).await
}

/// POST /media/videos: raw video bytes in the body.
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    store(&state, &claims, MediaKind::Video, &content_type(&headers), bytes.to_vec()).await
}

pub async fn upload_image_base64(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<Base64UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (mime, data) = parse_data_uri(&req.data)?;
    store(&state, &claims, MediaKind::Image, &mime, data).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path((kind, handle)): Path<(MediaKind, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let public_id =
        decode_handle(&handle).ok_or_else(|| ApiError::BadRequest("invalid media handle".into()))?;
    let host = host(&state)?;

    let (s, id, requester) = (state.clone(), public_id.clone(), claims.sub);
    blocking(move || s.services.media.authorize_removal(&id, kind, requester)).await?;

    let removed = host
        .delete(kind, &public_id)
        .await
        .map_err(ApiError::Upstream)?;
    let s = state.clone();
    blocking(move || s.services.media.forget(&public_id)).await?;
    if !removed {
        warn!(user_id = %claims.sub, "Delete requested for unknown media");
        return Err(reveal_core::CoreError::NotFound("media").into());
    }

    info!(user_id = %claims.sub, kind = kind.as_str(), "Media deleted");
    Ok(StatusCode::NO_CONTENT)
}
