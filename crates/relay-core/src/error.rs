use thiserror::Error;

/// Top-level error type for the relay.
///
/// The first group of variants mirrors the failure taxonomy of the webhook
/// pipeline; every collaborator call reports one of them instead of
/// panicking. The second group covers ambient concerns (config, storage, I/O).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Article retrieval failed: {0}")]
    Retrieval(String),

    #[error("Completion failed: {0}")]
    Generation(String),

    #[error("Ticket creation failed: {0}")]
    Ticketing(String),

    #[error("Message delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid webhook signature: {0}")]
    SignatureInvalid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RelayError {
    fn from(err: toml::ser::Error) -> Self {
        RelayError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
