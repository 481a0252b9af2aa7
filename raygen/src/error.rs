//! Module containing the raygen universal error type
use thiserror::Error;

/// Universal error type for raygen
///
/// The engine itself never fails (overflow is reported through clip flags);
/// these errors are raised at the host-facing boundary, when building or
/// decoding configurations and when calling the convenience wrappers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Word slice length does not match the camera layout
    #[error("bad word count: expected {expected} words, got {actual}")]
    BadWordCount {
        /// Number of words required by the layout
        expected: usize,
        /// Number of words provided
        actual: usize,
    },

    /// Image width must be at least one pixel
    #[error("image width must be at least one pixel")]
    ZeroWidth,

    /// Aspect ratio must be positive and finite
    #[error("aspect ratio must be positive and finite, got {0}")]
    BadAspectRatio(f64),

    /// A derived camera quantity does not fit in Q16.16
    #[error("`{field}` value {value} is not representable in Q16.16")]
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// Value before conversion
        value: f64,
    },

    /// Reciprocal square root input must be strictly positive
    #[error("reciprocal square root of non-positive value {0}")]
    NonPositive(f64),

    /// At least one refinement pass is required
    #[error("at least one refinement iteration is required")]
    ZeroIterations,
}
