use std::{path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Map, Value};
use tower_http::services::ServeDir;

use crate::{
    messages::{
        DEFAULT_ASPECT_RATIO, DEFAULT_RESOLUTION, ErrorPayload, GENERATE_PATH, VIDEO_FILENAME,
    },
    veo::{VeoError, VideoGenerator, VideoJob},
};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing GOOGLE_API_KEY. Set it in a .env file or as an environment variable.")]
    MissingApiKey,
}

/// Reads the API key, treating an empty value as missing.
pub fn api_key_from_env() -> Result<String, ConfigError> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingApiKey)
}

/// Shared state of the HTTP handlers.
pub struct AppState {
    /// Renders the clips.
    pub generator: Arc<dyn VideoGenerator>,
    /// Model used when the request does not name one.
    pub default_model: String,
}

/// Body of `POST /api/generate`. Anything that is not a JSON object reads as
/// empty, and a field that is not a string reads as absent.
type GeneratePayload = Map<String, Value>;

/// Failure of a generation request, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    MissingPrompt,
    Generation(VeoError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingPrompt => (StatusCode::BAD_REQUEST, "Prompt is required.".to_string()),
            ApiError::Generation(VeoError::NoVideo) => {
                (StatusCode::BAD_GATEWAY, VeoError::NoVideo.to_string())
            }
            ApiError::Generation(VeoError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, VeoError::Timeout.to_string())
            }
            ApiError::Generation(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Video generation failed: {err}"),
            ),
        };

        (status, Json(ErrorPayload::new(message))).into_response()
    }
}

impl From<VeoError> for ApiError {
    fn from(err: VeoError) -> Self {
        ApiError::Generation(err)
    }
}

/// Builds the application router. Without a static directory `/` answers
/// with a plain greeting.
pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route(GENERATE_PATH, post(post_generate))
        .with_state(Arc::new(state));

    match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api.route("/", get(|| async { "Welcome to veo-studio!" })),
    }
}

async fn post_generate(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match generate(&state, &body).await {
        Ok(video) => (
            [
                (header::CONTENT_TYPE, "video/mp4".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("inline; filename=\"{VIDEO_FILENAME}\""),
                ),
            ],
            video,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn generate(state: &AppState, body: &[u8]) -> Result<Bytes, ApiError> {
    let payload: GeneratePayload = serde_json::from_slice(body).unwrap_or_default();
    let job = to_job(&payload, &state.default_model)?;

    log::info!(
        "Generating with {} ({}, {})",
        job.model,
        job.aspect_ratio,
        job.resolution
    );

    match state.generator.generate(job).await {
        Ok(video) => {
            log::info!("Returning {} bytes of video", video.len());
            Ok(video)
        }
        Err(err) => {
            log::error!("Generation failed: {err}");
            Err(err.into())
        }
    }
}

fn to_job(payload: &GeneratePayload, default_model: &str) -> Result<VideoJob, ApiError> {
    let prompt = text(payload, "prompt").unwrap_or_default().trim();
    if prompt.is_empty() {
        return Err(ApiError::MissingPrompt);
    }

    Ok(VideoJob {
        model: or_default(text(payload, "model"), default_model),
        prompt: prompt.to_string(),
        negative_prompt: text(payload, "negative_prompt")
            .map(str::trim)
            .filter(|negative| !negative.is_empty())
            .map(str::to_string),
        aspect_ratio: or_default(text(payload, "aspect_ratio"), DEFAULT_ASPECT_RATIO),
        resolution: or_default(text(payload, "resolution"), DEFAULT_RESOLUTION),
    })
}

fn text<'a>(payload: &'a GeneratePayload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}
