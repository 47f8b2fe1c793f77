use thiserror::Error;

/// Result type for polyak operations
pub type Result<T> = std::result::Result<T, PolyakError>;

/// Main error type for the polyak library
#[derive(Debug, Error)]
pub enum PolyakError {
    /// Invalid configuration detected at construction time. Always fatal.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Sampling was attempted before enough transitions were stored
    #[error("Insufficient data: requested {requested} samples but only {available} stored")]
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Numerical computation errors
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Failure reported by an environment
    #[error("Environment error: {0}")]
    Environment(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Training orchestration errors (worker threads, channels)
    #[error("Training error: {0}")]
    Training(String),
}

impl From<bincode::Error> for PolyakError {
    fn from(err: bincode::Error) -> Self {
        PolyakError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for PolyakError {
    fn from(err: serde_yaml::Error) -> Self {
        PolyakError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PolyakError {
    fn from(err: serde_json::Error) -> Self {
        PolyakError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl PolyakError {
    pub fn configuration<S: Into<String>>(reason: S) -> Self {
        PolyakError::Configuration(reason.into())
    }

    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        PolyakError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        PolyakError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error must abort startup rather than be handled
    pub fn is_fatal(&self) -> bool {
        matches!(self, PolyakError::Configuration(_))
    }
}
