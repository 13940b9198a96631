use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::TransportError,
    messages::{GENERATE_PATH, GenerateRequest},
};

/// Status and body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body, the video on success.
    pub body: Bytes,
}

impl TransportResponse {
    /// Mirrors `Response.ok`: any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one generation request and hands back the raw response.
///
/// Non-2xx statuses are not errors at this layer; only failures to talk to
/// the server are.
#[async_trait(?Send)]
pub trait GenerateTransport {
    async fn generate(&self, request: &GenerateRequest) -> Result<TransportResponse, TransportError>;
}

/// JSON-over-HTTP transport backed by `reqwest`. Works natively and in the
/// browser, where reqwest delegates to `fetch`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    /// Targets `{origin}/api/generate`.
    pub fn new(origin: &str) -> Result<Self, TransportError> {
        Self::with_client(reqwest::Client::new(), origin)
    }

    /// Like [`new`](Self::new) with a caller-provided client.
    pub fn with_client(client: reqwest::Client, origin: &str) -> Result<Self, TransportError> {
        let raw = format!("{}{}", origin.trim_end_matches('/'), GENERATE_PATH);
        let endpoint = reqwest::Url::parse(&raw)
            .map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))?;
        Ok(Self { client, endpoint })
    }

    /// The full `/api/generate` url.
    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl GenerateTransport for HttpTransport {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<TransportResponse, TransportError> {
        log::debug!("POST {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        log::debug!("Received {} bytes with status {}", body.len(), status);

        Ok(TransportResponse { status, body })
    }
}
