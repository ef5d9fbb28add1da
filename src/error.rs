use thiserror::Error;

pub type Result<T> = std::result::Result<T, SecsError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecsError {
    #[error("invalid geometry for point {index}: {reason}")]
    InvalidGeometry { index: usize, reason: String },

    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("regularization parameter must be finite and within (0, 1), got {0}")]
    InvalidRegularization(f64),

    #[error("standard deviation of observation {index} must be strictly positive, got {value}")]
    InvalidUncertainty { index: usize, value: f64 },

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("singular value decomposition did not converge")]
    Decomposition,

    #[error("invalid configuration: {0}")]
    Config(String),
}
