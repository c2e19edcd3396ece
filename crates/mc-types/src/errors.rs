use thiserror::Error;

/// Main error type for margin calibration
#[derive(Error, Debug)]
pub enum CalError {
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    #[error("Optimization failed after {evaluations} evaluations: {last_error}")]
    OptimizationFailed {
        evaluations: usize,
        last_error: String,
    },

    #[error("Cache entry corrupt for {mode}: {message}")]
    CacheCorrupt { mode: String, message: String },

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CalError {
    /// Stable, user-facing name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownMode(_) => "UnknownModeError",
            Self::Training(_) => "TrainingError",
            Self::OptimizationFailed { .. } => "OptimizationFailedError",
            Self::CacheCorrupt { .. } => "CacheCorruptError",
            Self::Data(_) => "DataError",
            Self::Config(_) => "ConfigError",
            Self::Validation(_) => "ValidationError",
            Self::Io(_) => "IoError",
            Self::Serialization(_) => "SerializationError",
        }
    }
}

/// A single model fit that could not produce a usable objective value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    #[error("Model rejected parameters: {message}")]
    Rejected { message: String },

    #[error("Non-finite objective: {value}")]
    NonFinite { value: f64 },

    #[error("Empty training set")]
    EmptyData,
}

/// Historical data errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Data parsing error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("No games available")]
    Empty,
}

/// Result type alias for calibration operations
pub type CalResult<T> = Result<T, CalError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::CalError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::CalError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CalError::OptimizationFailed {
            evaluations: 40,
            last_error: "Non-finite objective: NaN".to_string(),
        };

        assert!(error.to_string().contains("40 evaluations"));
        assert!(error.to_string().contains("NaN"));
        assert_eq!(error.kind(), "OptimizationFailedError");
    }

    #[test]
    fn test_error_conversion() {
        let training = TrainingError::Rejected {
            message: "k must be positive".to_string(),
        };
        let error: CalError = training.into();

        match error {
            CalError::Training(_) => (),
            _ => panic!("Expected Training error"),
        }
    }

    #[test]
    fn test_macros() {
        let validation = validation_error!("bad value: {}", 42);
        assert_eq!(validation.kind(), "ValidationError");
        let config = config_error!("missing mode: {}", "total");
        assert!(config.to_string().contains("total"));
    }
}
