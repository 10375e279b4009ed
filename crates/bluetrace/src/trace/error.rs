use thiserror::Error;

use crate::parser::{DecodeError, LineShape};

/// Per-line reconstruction failure. Reported and skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error("{shape} line failed to decode: {source}")]
    Decode {
        shape: &'static str,
        #[source]
        source: DecodeError,
    },

    #[error("completion result with no open operation")]
    DanglingCompletion,

    #[error("{0} line with no open operation")]
    NoOpenOperation(&'static str),

    #[error("{0} line with no open small write")]
    NoOpenSmallWrite(&'static str),

    #[error("second _do_write for the same operation, keeping the first")]
    DuplicateDoWrite,
}

impl TraceError {
    pub fn decode(shape: LineShape, source: DecodeError) -> Self {
        TraceError::Decode { shape: shape.as_str(), source }
    }

    /// Decode errors come from the line text; the rest from lifecycle state.
    pub fn is_decode(&self) -> bool {
        matches!(self, TraceError::Decode { .. })
    }
}
