use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A vector length disagrees with the width the operation expects.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    /// A scaler saw a constant feature. The scaler is still fitted (with a
    /// default range/variance for those dimensions).
    #[error("degenerate scale in dimensions {dims:?}")]
    DegenerateScale { dims: Vec<usize> },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("numeric failure: {0}")]
    Numeric(String),
    #[error("scaler has not been fitted")]
    NotScaled,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[inline]
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }
}

/// Returns `ShapeMismatch` unless `actual == expected`.
#[inline]
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::shape(what, expected, actual));
    }
    Ok(())
}
