/// Failure of the network layer before a status code was received, or while
/// reading the body.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

/// Failure to turn a video payload into a playable object URL.
#[derive(Debug, thiserror::Error)]
pub enum ObjectUrlError {
    #[error("could not create object url: {0}")]
    Create(String),
}
