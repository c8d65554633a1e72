use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::normalize::Recognition;
use crate::service::RecognitionService;
use crate::upload::{self, UploadError, MAX_UPLOAD_BYTES};

// Leaves room above the upload cap so oversized files reach validation.
const BODY_LIMIT_BYTES: usize = 2 * MAX_UPLOAD_BYTES;

pub struct AppState {
    pub service: RecognitionService,
}

impl AppState {
    pub fn new(service: RecognitionService) -> Self {
        Self { service }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/recognize/shazam", post(recognize_shazam))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Music Recognition API listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Music Recognition API",
        "endpoints": {
            "shazam": "/recognize/shazam (POST)",
            "acr": "/recognize/acr (POST)",
            "audd": "/recognize/audd (POST)",
            "test": "/test-shazam (GET)"
        }
    }))
}

async fn recognize_shazam(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Recognition>> {
    let (filename, data) = read_file_field(&mut multipart).await?;
    upload::validate_upload(filename.as_deref(), &data)?;

    tracing::info!(
        filename = filename.as_deref().unwrap_or_default(),
        bytes = data.len(),
        "Recognizing upload"
    );

    let recognition = state.service.recognize_bytes(&data).await;
    if let Recognition::Error { message } = recognition {
        return Err(ApiError::RecognitionFailure(message));
    }
    Ok(Json(recognition))
}

/// Drain the multipart body and return the `file` field's name and bytes.
///
/// The declared filename is checked before the payload is read, and reading
/// stops as soon as the payload passes `MAX_UPLOAD_BYTES`.
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<(Option<String>, Vec<u8>)> {
    let mut upload = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        if !filename.as_deref().is_some_and(upload::has_allowed_extension) {
            return Err(UploadError::UnsupportedType.into());
        }

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error("Failed to read upload", e))?
        {
            if data.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(UploadError::TooLarge.into());
            }
            data.extend_from_slice(&chunk);
        }
        upload = Some((filename, data));
    }

    upload.ok_or_else(|| ApiError::InvalidInput("Missing file field".to_string()))
}

// A body cut off by the transport limit is still an oversized upload.
fn multipart_error(context: &str, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge.into();
    }
    ApiError::InvalidInput(format!("{}: {}", context, err))
}
