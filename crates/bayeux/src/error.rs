use thiserror::Error;

/// Errors surfaced at the HTTP boundary of both connectors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("unknown client id")]
    UnknownClient,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unsupported connection type")]
    UnsupportedConnectionType,
}
