//! Error types for docqa.

use thiserror::Error;

/// Result type alias using RagError.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur anywhere in docqa.
///
/// An empty corpus is not an error: retrieval returns an empty result instead.
#[derive(Error, Debug)]
pub enum RagError {
    /// The vector index does not exist or cannot be reached.
    #[error("Vector index unavailable: {reason}")]
    UnavailableIndex { reason: String },

    /// A scoring or embedding model failed to initialize.
    #[error("Failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Failed to load content from source.
    #[error("Failed to load content from {uri}: {reason}")]
    LoadFailed { uri: String, reason: String },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Embedding model error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Cross-encoder scoring error.
    #[error("Rerank error: {message}")]
    Rerank { message: String },

    /// Language model call failed.
    #[error("Generation error: {message}")]
    Generation { message: String },

    /// Chunking error.
    #[error("Chunking error: {message}")]
    Chunking { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RagError {
    /// Create an unavailable index error.
    pub fn unavailable_index(reason: impl Into<String>) -> Self {
        Self::UnavailableIndex {
            reason: reason.into(),
        }
    }

    /// Create a model load error.
    pub fn model_load(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a load failure for `uri`.
    pub fn load_failed(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a rerank error.
    pub fn rerank(message: impl Into<String>) -> Self {
        Self::Rerank {
            message: message.into(),
        }
    }

    /// Create a generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create a chunking error.
    pub fn chunking(message: impl Into<String>) -> Self {
        Self::Chunking {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the failure is a missing dependency rather than a pipeline fault.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::UnavailableIndex { .. })
    }

    /// Stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnavailableIndex { .. } => "UNAVAILABLE_INDEX",
            Self::ModelLoad { .. } => "MODEL_LOAD_FAILED",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::LoadFailed { .. } => "LOAD_FAILED",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Rerank { .. } => "RERANK_ERROR",
            Self::Generation { .. } => "GENERATION_ERROR",
            Self::Chunking { .. } => "CHUNKING_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
