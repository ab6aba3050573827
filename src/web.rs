use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::PreprocessPolicy;
use crate::error::AnalysisError;
use crate::models::{ImageKind, UploadedImage};
use crate::services::{image_prep, EstimationService};

/// Uploads can be phone photos; the axum default of 2 MB is too tight.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub struct AppState {
    pub estimator: Arc<dyn EstimationService>,
    pub prompt: String,
    pub preprocess: PreprocessPolicy,
    /// The one upload of the current session. Cleared on reset.
    pub upload: Mutex<Option<UploadedImage>>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn analysis_error_response(err: AnalysisError) -> Response {
    let status = match err {
        AnalysisError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Http { .. } | AnalysisError::Parse(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/upload", post(upload_image))
        .route("/api/analyze", post(analyze))
        .route("/api/reset", post(reset))
        .route("/api/exit-info", get(exit_info))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Store the uploaded meal photo for the session. Expects one multipart
/// field named `image` declared as PNG or JPEG.
async fn upload_image(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("could not read the upload: {err}"),
                );
            }
        };

        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let declared_mime = field.content_type().map(|mime| mime.to_string());

        let kind = declared_mime
            .as_deref()
            .and_then(ImageKind::from_mime)
            .or_else(|| ImageKind::from_file_name(&file_name));
        let Some(kind) = kind else {
            return error_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Only PNG and JPEG images are supported.",
            );
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("could not read the upload: {err}"),
                );
            }
        };
        if bytes.is_empty() {
            return error_response(StatusCode::BAD_REQUEST, "The uploaded file is empty.");
        }

        let size = bytes.len();
        log::info!("📸 Image uploaded: {} ({} bytes, {:?})", file_name, size, kind);

        *state.upload.lock().await = Some(UploadedImage {
            bytes: bytes.to_vec(),
            kind,
            file_name: file_name.clone(),
        });

        return (
            StatusCode::OK,
            Json(json!({ "file_name": file_name, "size": size })),
        )
            .into_response();
    }

    error_response(StatusCode::BAD_REQUEST, "No image field in the upload.")
}

/// One submission: prepare the stored upload, make one call to the model,
/// return its answer verbatim. Every failure comes back as a user-visible
/// message; nothing is retried.
async fn analyze(State(state): State<Arc<AppState>>) -> Response {
    let upload = state.upload.lock().await.clone();
    let Some(upload) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "Please upload an image first.");
    };

    log::info!("🍱 Analyzing {}...", upload.file_name);

    let encoded = match image_prep::prepare_image(&upload.bytes, &state.preprocess) {
        Ok(encoded) => encoded,
        Err(err) => {
            log::error!("❌ Image preparation failed: {}", err);
            return analysis_error_response(err);
        }
    };

    match state.estimator.estimate(&encoded, &state.prompt).await {
        Ok(result) => (StatusCode::OK, Json(json!({ "result": result }))).into_response(),
        Err(err) => {
            log::error!("❌ Estimation failed: {}", err);
            analysis_error_response(err)
        }
    }
}

async fn reset(State(state): State<Arc<AppState>>) -> Response {
    *state.upload.lock().await = None;
    log::info!("🔄 Upload cleared");
    (StatusCode::OK, Json(json!({ "status": "cleared" }))).into_response()
}

async fn exit_info() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "message": "To close the app, press Ctrl+C in the terminal or close this browser tab."
        })),
    )
        .into_response()
}

async fn health_check() -> &'static str {
    "OK"
}
