//! Emit: hands finished lifecycle records to the surrounding program.

mod json;

pub use json::JsonEmitter;

use thiserror::Error;

use crate::trace::ThreadState;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sink for finished records, called in `finish` order.
pub trait Emitter {
    fn emit(&mut self, record: ThreadState) -> Result<(), EmitError>;

    fn flush(&mut self) -> Result<(), EmitError> {
        Ok(())
    }
}

/// In-memory collection.
impl Emitter for Vec<ThreadState> {
    fn emit(&mut self, record: ThreadState) -> Result<(), EmitError> {
        self.push(record);
        Ok(())
    }
}
