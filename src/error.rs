use thiserror::Error;

/// Main error type for autokit helpers
#[derive(Error, Debug)]
pub enum AutokitError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Argument errors
    #[error("{0}")]
    Validation(String),

    // Execution engine errors
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    // Hyperparameter errors
    #[error("Hyperparameter error: {0}")]
    HyperParameter(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AutokitError {
    /// True when the execution engine ran out of memory for the requested batch.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, AutokitError::ResourceExhausted(_))
    }
}

/// Result type alias for AutokitError
pub type Result<T> = std::result::Result<T, AutokitError>;
