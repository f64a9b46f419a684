use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Input file line {line}: {message}")]
    InputFormatError { line: usize, message: String },

    #[error("Syntax error in constraint '{expression}' (line {line}, column {column}): {message}")]
    ExpressionError {
        line: usize,
        column: usize,
        expression: String,
        message: String,
    },

    #[error("Constraint '{expression}' references x[{index}] but the space has {ndims} dimensions")]
    IndexOutOfRangeError {
        expression: String,
        index: usize,
        ndims: usize,
    },

    #[error("Seed point violates constraint '{constraint}' (margin {margin})")]
    InfeasibleSeedError { constraint: String, margin: f64 },

    #[error(
        "Sampler stalled after {found} of {requested} points: {reason} (anchor {anchor:?}, step scale {step_scale:?})"
    )]
    ProgressError {
        found: usize,
        requested: usize,
        reason: String,
        anchor: Vec<f64>,
        step_scale: Vec<f64>,
    },

    #[error("Background sampling task failed: {message}")]
    TaskError { message: String },
}

/// Failure while evaluating an expression at one candidate point.
///
/// Never leaves the evaluator: a candidate that triggers one of these is
/// simply rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("undefined result for {operation}")]
    Undefined { operation: &'static str },

    #[error("x[{index}] is outside a point of {len} coordinates")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Progress,
    Io,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SamplerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SamplerError::ConfigError { .. }
            | SamplerError::InvalidConfigValueError { .. }
            | SamplerError::ConfigValidationError { .. }
            | SamplerError::InputFormatError { .. }
            | SamplerError::ExpressionError { .. }
            | SamplerError::IndexOutOfRangeError { .. }
            | SamplerError::InfeasibleSeedError { .. } => ErrorCategory::Configuration,
            SamplerError::ProgressError { .. } => ErrorCategory::Progress,
            SamplerError::IoError(_)
            | SamplerError::CsvError(_)
            | SamplerError::SerializationError(_) => ErrorCategory::Io,
            SamplerError::TaskError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Progress => ErrorSeverity::Medium,
            ErrorCategory::Io | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 1,
            ErrorCategory::Progress => 2,
            ErrorCategory::Io | ErrorCategory::Internal => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SamplerError::IoError(_) => {
                "Check that the input file exists and the output directory is writable".to_string()
            }
            SamplerError::InputFormatError { .. } => {
                "Line 1 must hold the dimension count and line 2 the seed point".to_string()
            }
            SamplerError::ExpressionError { .. } => {
                "Constraints use + - * / **, parentheses, numbers and x[i], joined by one of >= <= > < ==".to_string()
            }
            SamplerError::IndexOutOfRangeError { ndims, .. } => {
                format!("Variable indices must lie in 0..{}", ndims)
            }
            SamplerError::InfeasibleSeedError { .. } => {
                "Provide a seed point that satisfies every constraint".to_string()
            }
            SamplerError::ProgressError { .. } => {
                "The feasible region may be a single point or too thin; loosen the constraints or lower collapse_threshold".to_string()
            }
            SamplerError::InvalidConfigValueError { field, .. }
            | SamplerError::ConfigValidationError { field, .. } => {
                format!("Fix the '{}' setting", field)
            }
            SamplerError::ConfigError { .. } => "Review the command line arguments".to_string(),
            SamplerError::CsvError(_) | SamplerError::SerializationError(_) => {
                "Check the output format and destination".to_string()
            }
            SamplerError::TaskError { .. } => "Retry with --walks 1".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SamplerError::ProgressError {
                found, requested, ..
            } => format!(
                "Could only find {} of {} points before the random walk stopped making progress",
                found, requested
            ),
            SamplerError::InfeasibleSeedError { constraint, .. } => {
                format!("The seed point does not satisfy '{}'", constraint)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SamplerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_category() {
        let config = SamplerError::InputFormatError {
            line: 1,
            message: "bad".to_string(),
        };
        assert_eq!(config.category(), ErrorCategory::Configuration);
        assert_eq!(config.exit_code(), 1);

        let progress = SamplerError::ProgressError {
            found: 3,
            requested: 10,
            reason: "step scale collapsed".to_string(),
            anchor: vec![5.0],
            step_scale: vec![1e-13],
        };
        assert_eq!(progress.category(), ErrorCategory::Progress);
        assert_eq!(progress.exit_code(), 2);
        assert!(progress.user_friendly_message().contains("3 of 10"));

        let io = SamplerError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.exit_code(), 3);
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }
}
