use std::fmt::Display;

use segmesh_decode::DecodeError;
use thiserror::Error;

/// Result type for client and worker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading meshes or talking to a worker.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to retrieve {url}: {reason}")]
    RetrievalFailed { url: String, reason: String },

    #[error("malformed mesh: {0}")]
    MalformedMesh(#[from] DecodeError),

    #[error("method: {method} not yet implemented")]
    UnsupportedMethod { method: String },

    #[error("{mesh_type} meshes must be decoded outside the worker")]
    UnsupportedMeshType { mesh_type: String },

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("no pending request with id {id}")]
    ProtocolViolation { id: String },

    #[error("worker error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("request {id} timed out")]
    Timeout { id: String },

    #[error("worker channel closed")]
    ChannelClosed,

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to start worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn retrieval(url: &str, reason: impl Display) -> Self {
        Self::RetrievalFailed {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// RPC error code carried in error envelopes.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::MalformedMesh(_)
            | Self::UnsupportedMethod { .. }
            | Self::UnsupportedMeshType { .. }
            | Self::InvalidParams(_) => 400,
            Self::RetrievalFailed { .. } => 502,
            Self::ChannelClosed => 503,
            Self::Timeout { .. } => 504,
            Self::Remote { code, .. } => *code,
            Self::ProtocolViolation { .. } | Self::HttpClient(_) | Self::Spawn(_) => 500,
        }
    }

    /// Returns `true` for transient errors that may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetrievalFailed { .. } | Self::Timeout { .. } => true,
            Self::Remote { code, .. } => matches!(code, 502 | 504),
            _ => false,
        }
    }
}
