use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unrecognized message shape")]
    UnrecognizedMessage,
}
