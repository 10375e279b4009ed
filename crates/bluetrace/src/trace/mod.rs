//! Trace: reconstruction of operation lifecycles from classified lines.
//!
//! The [`OpTracker`] owns the per-thread store and drives the lifecycle
//! state machine; [`align`] classifies finished operations.

pub mod align;
pub mod error;
pub mod machine;
pub mod metrics;
pub mod model;
pub mod store;

pub use error::TraceError;
pub use machine::{LineOutcome, OpTracker, TrackerOptions};
pub use metrics::{SkipReason, TraceMetrics};
pub use model::{Alignment, Operation, ThreadState, Timestamps};
pub use store::ThreadStore;
