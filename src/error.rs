use crate::index::EmbeddingError;
use crate::retrieval::{FusionError, RerankError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for plotfindr
#[derive(Error, Debug)]
pub enum PlotError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Malformed metadata filter (e.g. inverted year range)
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Corpus loading or consistency errors
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Query encoder failures
    #[error("Encoder failure: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Pairwise scorer failures
    #[error("Reranker failure: {0}")]
    Rerank(#[from] RerankError),

    /// Invalid fusion weights
    #[error("Fusion error: {0}")]
    Fusion(#[from] FusionError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlotError {
    /// True when the error came from an external model capability
    /// (query encoder or pairwise scorer) rather than from input or data.
    pub fn is_external(&self) -> bool {
        matches!(self, PlotError::Embedding(_) | PlotError::Rerank(_))
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for plotfindr operations
pub type Result<T> = std::result::Result<T, PlotError>;
