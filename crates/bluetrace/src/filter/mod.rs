//! Filter: regex selection of emitted lifecycle records.

pub mod engine;

pub use engine::{FilterEngine, FilterError, FilterMode};
