use thiserror::Error;

/// Errors raised while computing cutoffs.
///
/// The absence of a drop, crossing or threshold breach is not an error:
/// every strategy has a defined default for that case.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Window must be odd, positive, larger than the polynomial order and
    /// no longer than the data.
    #[error("invalid window of {window} samples for polynomial order {poly_order} over {len} samples")]
    InvalidWindow {
        window: usize,
        poly_order: usize,
        len: usize,
    },
    /// Filter shape rejected before any data is seen
    #[error("invalid filter: window of {window} samples for polynomial order {poly_order}")]
    InvalidFilter { window: usize, poly_order: usize },
    /// A detector or strategy parameter is out of its domain
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Too few samples to evaluate a strategy
    #[error("insufficient data: {available} samples, need at least {required}")]
    InsufficientData { available: usize, required: usize },
    /// Least-squares system could not be solved
    #[error("computation error: {0}")]
    Computation(String),
    #[error("curve is malformed: {0}")]
    MalformedCurve(String),
    #[error("missing field {0:?} in csv header")]
    MissingField(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for segmentation operations
pub type Result<T> = std::result::Result<T, SegmentError>;
