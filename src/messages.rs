use serde::{Deserialize, Serialize};

/// Path of the generation endpoint, relative to the server origin.
pub const GENERATE_PATH: &str = "/api/generate";

/// File name used for the served and downloaded video.
pub const VIDEO_FILENAME: &str = "ai-generated-video.mp4";

/// Aspect ratio used by the server when the request leaves it empty.
pub const DEFAULT_ASPECT_RATIO: &str = "9:16";

/// Resolution used by the server when the request leaves it empty.
pub const DEFAULT_RESOLUTION: &str = "720p";

/// Raw values read from the form fields, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    /// Contents of the prompt textarea.
    pub prompt: String,
    /// Contents of the negative prompt input.
    pub negative_prompt: String,
    /// Selected aspect ratio option.
    pub aspect_ratio: String,
    /// Selected resolution option.
    pub resolution: String,
}

impl FormValues {
    /// Builds the request body, or `None` when the prompt is blank.
    pub fn to_request(&self) -> Option<GenerateRequest> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return None;
        }

        Some(GenerateRequest {
            prompt: prompt.to_string(),
            negative_prompt: self.negative_prompt.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
            resolution: self.resolution.clone(),
        })
    }
}

/// JSON body sent by the form to `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GenerateRequest {
    /// Trimmed prompt.
    pub prompt: String,
    /// Sent as typed, possibly empty.
    pub negative_prompt: String,
    /// Selected aspect ratio.
    pub aspect_ratio: String,
    /// Selected resolution.
    pub resolution: String,
}

/// JSON body of a failed generation. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorPayload {
    /// Payload carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// Parses an error body, falling back to an empty payload when the body
    /// is not a JSON object.
    pub fn parse_lenient(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}
