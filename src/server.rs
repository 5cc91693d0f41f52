//! HTTP surface: one route serving the upload form and the pipeline
//!
//! `GET /` renders a self-contained upload form; `POST /` takes the
//! multipart form (video, script, brand, product), runs the pipeline, and
//! answers with either the export as a download or a plain-text message
//! behind the failure marker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::Pipeline;

/// Marker prefixing every failure response
pub const FAILURE_PREFIX: &str = "\u{274c} processing failed: ";

/// Largest accepted request body; a 120 second phone clip fits comfortably
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Shared state for the handlers
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Pipeline,
}

/// Build the router: GET renders the form, POST runs the pipeline
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Bind the listener and serve until shutdown
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match handle_upload(&state, multipart).await {
        Ok(exported) => match attachment_response(&exported).await {
            Ok(response) => response,
            Err(err) => failure_response(&err),
        },
        Err(err) => failure_response(&err),
    }
}

/// Pull the four form fields out of the multipart body, persist the video,
/// and run the pipeline on it.
async fn handle_upload(state: &AppState, mut multipart: Multipart) -> Result<PathBuf> {
    let mut video: Option<Bytes> = None;
    let mut script = String::new();
    let mut brand = String::new();
    let mut product = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| PipelineError::Upload(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| PipelineError::Upload(err.to_string()))?;
                if !data.is_empty() {
                    video = Some(data);
                }
            }
            "script" => {
                script = field
                    .text()
                    .await
                    .map_err(|err| PipelineError::Upload(err.to_string()))?;
            }
            "brand" => {
                brand = field
                    .text()
                    .await
                    .map_err(|err| PipelineError::Upload(err.to_string()))?;
            }
            "product" => {
                product = field
                    .text()
                    .await
                    .map_err(|err| PipelineError::Upload(err.to_string()))?;
            }
            _ => {}
        }
    }

    let video = video.ok_or(PipelineError::MissingVideo)?;

    let upload_path = state
        .config
        .upload_dir
        .join(format!("{}.mp4", Uuid::new_v4()));
    tokio::fs::write(&upload_path, &video).await?;
    info!("saved upload ({} bytes) to {:?}", video.len(), upload_path);

    state
        .pipeline
        .process(&upload_path, &script, &brand, &product)
        .await
}

/// Render an error as the plain-text failure contract
fn failure_message(err: &PipelineError) -> String {
    format!("{FAILURE_PREFIX}{err}")
}

fn failure_response(err: &PipelineError) -> Response {
    warn!("request failed: {err}");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        failure_message(err),
    )
        .into_response()
}

/// Send the exported file back as a download
async fn attachment_response(path: &Path) -> Result<Response> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path.file_name().map_or_else(
        || "result.mp4".to_string(),
        |name| name.to_string_lossy().to_string(),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .map_err(|err| PipelineError::Internal(err.to_string()))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Reelmark</title>
<style>
  body { font-family: sans-serif; max-width: 480px; margin: 40px auto; padding: 0 16px; }
  label { display: block; margin-top: 14px; font-weight: bold; }
  input[type="text"], textarea { width: 100%; padding: 6px; box-sizing: border-box; }
  button { margin-top: 18px; padding: 8px 28px; }
  p.hint { color: #555; }
</style>
</head>
<body>
<h1>Reelmark</h1>
<p class="hint">Upload a portrait clip between 10 seconds and 2 minutes.
Captions switch at most every 3 seconds.</p>
<form method="post" enctype="multipart/form-data">
  <label for="video">Video</label>
  <input type="file" id="video" name="video" accept="video/*" required>
  <label for="brand">Brand name</label>
  <input type="text" id="brand" name="brand">
  <label for="product">Product name</label>
  <input type="text" id="product" name="product">
  <label for="script">Caption script (one line per caption)</label>
  <textarea id="script" name="script" rows="6"></textarea>
  <button type="submit">Create video</button>
</form>
</body>
</html>
"#;
