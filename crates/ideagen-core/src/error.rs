//! Error types for ideagen-core

use thiserror::Error;

/// Connection-level failure of the idea stream
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("stream endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream read failed: {0}")]
    Read(String),

    #[error("no data received for {0} seconds")]
    Timeout(u64),

    #[error("stream closed without completing")]
    Disconnected,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_builder() || err.is_request() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Read(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid endpoint URL '{0}'")]
    InvalidEndpoint(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing svix headers")]
    MissingHeaders,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid JSON payload")]
    InvalidJson,
}
