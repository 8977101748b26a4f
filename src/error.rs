use thiserror::Error;

/// Result type for Tyche operations
pub type Result<T> = std::result::Result<T, TycheError>;

/// Main error type for the Tyche library
#[derive(Debug, Error)]
pub enum TycheError {
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

    /// Action index outside of the action space
    #[error("Invalid action {action}: must be less than {max_actions}")]
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Context representation that no bandit knows how to produce
    #[error("context_type should be either tensor or int, found {0}")]
    UnsupportedContextType(String),

    /// Log format with no registered sink
    #[error("Unknown log format '{0}': expected one of csv, stdout, scalars")]
    UnknownLogFormat(String),

    /// Metric key that the sink did not see in its first record
    #[error("A new value '{0}' cannot be added to the CSV log")]
    UnregisteredMetric(String),

    /// Metric key written at a different column than it was registered at
    #[error("Metric '{key}' written at column {actual}, registered at column {expected}")]
    MetricOrder {
        key: String,
        expected: usize,
        actual: usize,
    },

    /// Record lacks a key the sink needs
    #[error("Record has no '{0}' entry")]
    MissingMetric(String),

    /// Empty buffer or container
    #[error("Empty buffer: {0}")]
    EmptyBuffer(String),

    /// Training error
    #[error("Training error: {0}")]
    Training(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper functions for common error patterns
impl TycheError {
    pub fn dimension_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        TycheError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TycheError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
