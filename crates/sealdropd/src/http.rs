//! HTTP API
//!
//! Endpoints:
//!   POST /api/upload         - multipart `file` + `passphrase` → 201 `{"id", "size"}`
//!   POST /api/download/{id}  - JSON `{"passphrase"}` → original file bytes
//!   GET  /healthz            - liveness probe (always 200 if process is running)
//!   GET  /readyz             - readiness probe (200 if storage is reachable)
//!   GET  /metrics            - Prometheus text format
//!
//! Every way a stored blob can fail to open (wrong passphrase, tampering,
//! truncation, bad metadata) answers with the same 400 body.

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path,
        State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus_client::{encoding::text::encode, registry::Registry};
use sealdrop_crypto::{CryptoError, KdfParams};
use sealdrop_storage::{BlobId, BlobStore, StorageError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::metrics::Metrics;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub kdf: KdfParams,
    pub metrics: Metrics,
    pub registry: Arc<Registry>,
    pub expose_metrics: bool,
}

pub fn router<S: BlobStore>(state: AppState<S>, max_body: usize) -> Router {
    Router::new()
        .route("/api/upload", post(upload::<S>))
        .route("/api/download/{id}", post(download::<S>))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler::<S>))
        .route("/metrics", get(metrics_handler::<S>))
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub passphrase: SecretString,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("blob not found")]
    NotFound,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("{1}")]
    Rejected(StatusCode, String),

    #[error("internal error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::DecryptionFailed => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Rejected(status, _) => *status,
            ApiError::Internal(detail) => {
                tracing::error!("request failed: {detail}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => ApiError::NotFound,
            StorageError::InvalidId(_) => ApiError::BadRequest("invalid blob id".into()),
            StorageError::Backend(e) => ApiError::Internal(format!("storage: {e}")),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        match e {
            e if e.is_decryption_failure() => ApiError::DecryptionFailed,
            CryptoError::EmptyPlaintext => ApiError::BadRequest("file is empty".into()),
            // Passphrases are checked before this point; what is left is
            // a KDF misconfiguration
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        match e {
            // Body read failures carry their own status (e.g. 413)
            JsonRejection::BytesRejection(_) => ApiError::Rejected(e.status(), e.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Rejected(e.status(), e.body_text())
    }
}

struct UploadedFile {
    filename: String,
    media_type: String,
    data: Vec<u8>,
}

async fn upload<S: BlobStore>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut passphrase: Option<SecretString> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "passphrase" => {
                passphrase = Some(SecretString::from(field.text().await?));
            }
            "file" => {
                let filename = field.file_name().unwrap_or("file").to_string();
                let media_type = resolve_media_type(&filename, field.content_type());
                let data = field.bytes().await?.to_vec();
                file = Some(UploadedFile {
                    filename,
                    media_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let passphrase = passphrase
        .filter(|p| !p.expose_secret().is_empty())
        .ok_or_else(|| ApiError::BadRequest("passphrase is required".into()))?;
    let file = file.ok_or_else(|| ApiError::BadRequest("file is required".into()))?;

    let size = file.data.len();
    let kdf = state.kdf;
    let blob = tokio::task::spawn_blocking(move || {
        sealdrop_crypto::seal(
            &file.data,
            &file.filename,
            &file.media_type,
            &passphrase,
            &kdf,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(format!("seal task: {e}")))??;

    let id = state.store.put(blob).await?;

    state.metrics.uploads.inc();
    state.metrics.bytes_sealed.inc_by(size as u64);
    tracing::info!(id = %id, bytes = size, "file sealed");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            id: id.to_string(),
            size,
        }),
    ))
}

async fn download<S: BlobStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = BlobId::parse(&id)?;
    let Json(req) = payload?;
    if req.passphrase.expose_secret().is_empty() {
        return Err(ApiError::BadRequest("passphrase is required".into()));
    }
    let passphrase = req.passphrase;

    let blob = state.store.get(&id).await?;

    let kdf = state.kdf;
    let opened =
        tokio::task::spawn_blocking(move || sealdrop_crypto::open(&blob, &passphrase, &kdf))
            .await
            .map_err(|e| ApiError::Internal(format!("open task: {e}")))?;

    let opened = match opened {
        Ok(file) => file,
        Err(e) => {
            if e.is_decryption_failure() {
                state.metrics.decrypt_failures.inc();
                tracing::info!(id = %id, "decryption failed");
            }
            return Err(e.into());
        }
    };

    state.metrics.downloads.inc();
    tracing::info!(id = %id, bytes = opened.data.len(), "file opened");

    let content_type = if opened.media_type.is_empty() {
        HeaderValue::from_static(FALLBACK_MEDIA_TYPE)
    } else {
        HeaderValue::from_str(&opened.media_type)
            .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_MEDIA_TYPE))
    };
    let disposition = HeaderValue::from_str(&content_disposition(&opened.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        opened.data,
    )
        .into_response())
}

/// Declared content type if the client sent a usable one, else a guess from
/// the file extension.
fn resolve_media_type(filename: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// `attachment` header with an ASCII-safe `filename` and an RFC 5987
/// `filename*` carrying the exact UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len() * 3);
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }

    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

async fn metrics_handler<S: BlobStore>(State(state): State<AppState<S>>) -> Response {
    if !state.expose_metrics {
        return StatusCode::NOT_FOUND.into_response();
    }
    let mut body = String::new();
    match encode(&mut body, &state.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Liveness probe: returns 200 if the process is running.
async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if storage is reachable, 503 otherwise.
async fn readyz_handler<S: BlobStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    match state.store.check().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage unreachable"),
    }
}
