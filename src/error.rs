//! Error taxonomy for loading, inference and fitting.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read, write or trust one of the six model artifacts
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact `{name}` not found at {}", path.display())]
    Missing { name: &'static str, path: PathBuf },

    #[error("artifact `{name}` could not be read: {source}")]
    Io {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact `{name}` could not be decoded: {source}")]
    Decode {
        name: &'static str,
        #[source]
        source: serde_cbor::Error,
    },

    #[error("artifact `{name}` could not be encoded: {source}")]
    Encode {
        name: &'static str,
        #[source]
        source: serde_cbor::Error,
    },

    #[error("artifact `{name}` is corrupt: {reason}")]
    Corrupt { name: &'static str, reason: String },
}

/// Anything that keeps the service from becoming ready
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("self-validation failed: {0}")]
    SelfCheck(String),
}

/// Text could not be turned into a feature vector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorizeError {
    /// The text carries NUL or U+FFFD, i.e. it was decoded lossily upstream.
    #[error("text contains invalid characters")]
    InvalidEncoding,

    #[error("no idf weight for vocabulary index {index}")]
    MissingIdf { index: usize },

    #[error("term weighting produced a non-finite value")]
    NonFinite,
}

impl VectorizeError {
    /// Whether the failure is caused by the caller's input rather than the model
    pub fn is_client_error(&self) -> bool {
        matches!(self, VectorizeError::InvalidEncoding)
    }
}

/// The classifier could not score a feature vector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("feature vector has dimension {got}, model expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("feature index {index} out of range for dimension {dim}")]
    IndexOutOfRange { index: usize, dim: usize },

    #[error("classifier produced a non-finite score")]
    NonFinite,
}

/// Request-level failures, each mapped to one HTTP status
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Request body must be a JSON object with a string field 'text'")]
    InvalidBody,

    #[error("text required")]
    TextRequired,

    #[error("text exceeds maximum length of {max} characters")]
    TextTooLong { max: usize },

    #[error(transparent)]
    Vectorize(#[from] VectorizeError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Internal server error")]
    Internal,
}

/// Offline fitting failures
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("malformed csv in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no `{column}` column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("dataset contains no usable rows")]
    EmptyDataset,

    #[error("training split contains only one class")]
    SingleClass,

    #[error(transparent)]
    Vectorize(#[from] VectorizeError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
