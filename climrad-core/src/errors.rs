use thiserror::Error;

/// Broad classification of a [`ClimradError`].
///
/// Configuration errors abort setup, shape errors reject a single step and
/// solver errors are whatever the external driver reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Shape,
    Solver,
}

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum ClimradError {
    #[error("{0}")]
    Error(String),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Invalid value {value} for {option}. Expected one of {expected}")]
    InvalidFlag {
        option: String,
        value: i64,
        expected: String,
    },
    #[error("{parameter}={value} is outside the valid range [{min}, {max}] of the {scheme} scheme")]
    OutOfRange {
        parameter: String,
        scheme: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("'{field}' has {found} spectral bands but the {domain} solver was compiled with {expected}")]
    BandCountMismatch {
        field: String,
        domain: String,
        expected: usize,
        found: usize,
    },
    #[error("Monte-Carlo seeds overlap: longwave={longwave}, shortwave={shortwave}. The lower seed must be at least {required} below the other")]
    SeedCollision {
        longwave: i32,
        shortwave: i32,
        required: usize,
    },
    #[error("Shape mismatch for '{field}': expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        field: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Missing required input '{0}'")]
    MissingInput(String),
    #[error("Invalid column grid: {0}")]
    InvalidGrid(String),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("The {0} solver has not been initialised")]
    NotInitialised(String),
    #[error("The {domain} solver failed: {message}")]
    SolverFailure { domain: String, message: String },
}

impl ClimradError {
    /// Classify the error following the configuration / shape / solver taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClimradError::Configuration(_)
            | ClimradError::InvalidFlag { .. }
            | ClimradError::OutOfRange { .. }
            | ClimradError::BandCountMismatch { .. }
            | ClimradError::SeedCollision { .. } => ErrorKind::Configuration,
            ClimradError::Error(_)
            | ClimradError::ShapeMismatch { .. }
            | ClimradError::MissingInput(_)
            | ClimradError::InvalidGrid(_)
            | ClimradError::InvalidValue { .. } => ErrorKind::Shape,
            ClimradError::NotInitialised(_) | ClimradError::SolverFailure { .. } => {
                ErrorKind::Solver
            }
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Convenience type for `Result<T, ClimradError>`.
pub type ClimradResult<T> = Result<T, ClimradError>;
