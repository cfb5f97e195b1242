//! Error types for revarena.

use thiserror::Error;

/// Coarse classification of an [`AdError`].
///
/// Input-validation and shape errors are raised during the forward pass,
/// before any tape node is scheduled. Allocator exhaustion and reverse-node
/// failures leave the episode unusable: its adjoints must be discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-finite or otherwise malformed forward input.
    InputValidation,
    /// Mismatched dimensions between cooperating values.
    Shape,
    /// The arena could not serve an allocation.
    AllocatorExhausted,
    /// A reverse-pass closure could not complete.
    ReverseNode,
}

/// Errors that can occur while building or running an AD episode.
#[derive(Debug, Error)]
pub enum AdError {
    /// A forward value contains a NaN or infinity.
    #[error("{function}: {name}[{index}] is {value}, but must be finite")]
    NonFinite {
        function: &'static str,
        name: &'static str,
        index: usize,
        value: f64,
    },

    /// Matrix must be square.
    #[error("{function}: {name} must be square, got {rows}x{cols}")]
    NotSquare {
        function: &'static str,
        name: &'static str,
        rows: usize,
        cols: usize,
    },

    /// Two cooperating values disagree on shape.
    #[error("{function}: {name} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        function: &'static str,
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Matrix is not symmetric within tolerance.
    #[error("{function}: {name} is not symmetric, {name}[{row},{col}] differs from {name}[{col},{row}]")]
    NotSymmetric {
        function: &'static str,
        name: &'static str,
        row: usize,
        col: usize,
    },

    /// Matrix is not positive definite.
    #[error("{function}: {name} is not positive definite")]
    NotPositiveDefinite {
        function: &'static str,
        name: &'static str,
    },

    /// Any other domain violation of a forward input.
    #[error("{function}: {name} {message}")]
    Domain {
        function: &'static str,
        name: &'static str,
        message: String,
    },

    /// The arena hit its configured element limit.
    #[error("arena exhausted: requested {requested} elements with {in_use} of {limit} in use")]
    ArenaExhausted {
        requested: usize,
        in_use: usize,
        limit: usize,
    },

    /// A triangular factor had a zero pivot during the reverse pass.
    #[error("{function}: singular triangular block")]
    Singular { function: &'static str },

    /// The reverse pass stopped at the first failing node.
    #[error("reverse pass aborted at tape node {index} ({label}): {source}")]
    ReverseAborted {
        index: usize,
        label: &'static str,
        #[source]
        source: Box<AdError>,
    },
}

impl AdError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdError::NonFinite { .. }
            | AdError::NotSymmetric { .. }
            | AdError::NotPositiveDefinite { .. }
            | AdError::Domain { .. } => ErrorKind::InputValidation,
            AdError::NotSquare { .. } | AdError::ShapeMismatch { .. } => ErrorKind::Shape,
            AdError::ArenaExhausted { .. } => ErrorKind::AllocatorExhausted,
            AdError::Singular { .. } | AdError::ReverseAborted { .. } => ErrorKind::ReverseNode,
        }
    }
}
