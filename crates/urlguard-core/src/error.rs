//! Error types for urlguard

/// Result type alias using urlguard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for urlguard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Feature extraction errors
    #[error("feature error: {0}")]
    Feature(String),

    /// Pattern matcher errors
    #[error("pattern error: {0}")]
    Pattern(String),

    /// Model loading or inference errors
    #[error("model error: {0}")]
    Model(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Capability invocation errors (page inspection, probes, lookups)
    #[error("capability error: {0}")]
    Capability(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new feature extraction error
    pub fn feature(msg: impl Into<String>) -> Self {
        Self::Feature(msg.into())
    }

    /// Create a new pattern matcher error
    pub fn pattern(msg: impl Into<String>) -> Self {
        Self::Pattern(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new capability error
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
