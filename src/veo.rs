//! Client for the Veo long-running video generation API.
//!
//! A generation is a three step affair: start an operation, poll it until it
//! reports `done`, then download the first generated sample.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
pub enum VeoError {
    #[error("Video generation operation timed out.")]
    Timeout,

    #[error("No video returned from the model.")]
    NoVideo,

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Operation(String),

    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

/// Everything the model needs to render one clip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoJob {
    /// Model id, e.g. `veo-3.1-fast-generate-preview`.
    pub model: String,
    /// Trimmed, never empty.
    pub prompt: String,
    /// Only sent when present.
    pub negative_prompt: Option<String>,
    /// e.g. `16:9` or `9:16`.
    pub aspect_ratio: String,
    /// e.g. `720p` or `1080p`.
    pub resolution: String,
}

/// Something that turns a [`VideoJob`] into MP4 bytes.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn generate(&self, job: VideoJob) -> Result<Bytes, VeoError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    aspect_ratio: &'a str,
    resolution: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
}

/// A long-running operation as reported by the API.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<OperationResponse>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoFile>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VideoFile {
    pub uri: String,
}

impl Operation {
    /// URI of the first generated video, if the operation produced one.
    pub fn first_video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .iter()
            .find_map(|sample| sample.video.as_ref())
            .map(|video| video.uri.as_str())
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: OperationError,
}

/// REST client for the Gemini API video endpoints.
#[derive(Clone, Debug)]
pub struct VeoClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl VeoClient {
    /// Client for the public API with the default polling settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets how often the operation is polled and how long to wait overall.
    pub fn with_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    /// Starts a generation and returns the pending operation.
    pub async fn start(&self, job: &VideoJob) -> Result<Operation, VeoError> {
        let url = format!("{}/models/{}:predictLongRunning", self.api_base, job.model);
        let body = PredictRequest {
            instances: [Instance {
                prompt: &job.prompt,
            }],
            parameters: Parameters {
                aspect_ratio: &job.aspect_ratio,
                resolution: &job.resolution,
                negative_prompt: job.negative_prompt.as_deref(),
            },
        };

        log::debug!("Starting generation on {}", job.model);

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Fetches the current state of an operation.
    pub async fn poll(&self, name: &str) -> Result<Operation, VeoError> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_base, name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Polls until the operation is done or the timeout is hit.
    pub async fn wait(&self, mut operation: Operation) -> Result<Operation, VeoError> {
        let deadline = Instant::now() + self.timeout;

        while !operation.done {
            if Instant::now() > deadline {
                log::warn!("Operation {} did not finish in time", operation.name);
                return Err(VeoError::Timeout);
            }

            tokio::time::sleep(self.poll_interval).await;
            operation = self.poll(&operation.name).await?;
            log::debug!("Operation {} done={}", operation.name, operation.done);
        }

        match operation.error.take() {
            Some(error) if error.message.trim().is_empty() => {
                log::warn!("Operation {} failed with code {:?}", operation.name, error.code);
                Err(VeoError::NoVideo)
            }
            Some(error) => Err(VeoError::Operation(error.message)),
            None => Ok(operation),
        }
    }

    /// Downloads a generated file.
    pub async fn download(&self, uri: &str) -> Result<Bytes, VeoError> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Ok(check(response).await?.bytes().await?)
    }
}

#[async_trait]
impl VideoGenerator for VeoClient {
    async fn generate(&self, job: VideoJob) -> Result<Bytes, VeoError> {
        let operation = self.start(&job).await?;
        log::info!("Started operation {}", operation.name);

        let operation = self.wait(operation).await?;
        let uri = operation.first_video_uri().ok_or(VeoError::NoVideo)?;

        let video = self.download(uri).await?;
        log::info!("Downloaded {} bytes from {}", video.len(), operation.name);

        Ok(video)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, VeoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);

    Err(VeoError::Api {
        status: status.as_u16(),
        message,
    })
}
