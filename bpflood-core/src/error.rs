//! Error types for bpflood operations

/// Errors raised while configuring or driving a decoder
///
/// Every variant except [`DecoderError::LengthMismatch`] denotes a wiring or
/// configuration defect detected once, at setup. Running out of iterations is
/// not an error: it is reported through the `converged` flag of a decode
/// outcome.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecoderError {
    /// The check-node and variable-node degree sequences describe different edge counts
    #[error("Degree sum mismatch: checks account for {check_edges} edges, variables for {variable_edges}")]
    DegreeSumMismatch {
        /// Sum of the check-node degrees.
        check_edges: u64,
        /// Sum of the variable-node degrees.
        variable_edges: u64,
    },

    /// The edge transpose is not a permutation of `[0, E)`
    #[error("Invalid edge transpose: {0}")]
    InvalidTranspose(String),

    /// Code dimensions or sequences are inconsistent
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A buffer handed to the decoder or reorderer has the wrong size
    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch {
        /// The number of values expected.
        expected: usize,
        /// The number of values actually provided.
        actual: usize,
    },

    /// The frame count is zero or does not match a fixed frame count
    #[error("Unsupported frame count: {0}")]
    UnsupportedFrameCount(usize),

    /// The byte-width lookup was asked about a type it does not know
    #[error("Unsupported element type {0}: this should never happen")]
    UnsupportedElementType(&'static str),

    /// A routing primitive was invoked without being provided by the router
    #[error("Routing primitive not implemented: {0}")]
    NotImplemented(&'static str),

    /// Malformed alist text
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number of the offending line.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// IO error while reading a code description
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DecoderError {
    fn from(err: std::io::Error) -> Self {
        DecoderError::Io(err.to_string())
    }
}
