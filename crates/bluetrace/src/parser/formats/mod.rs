/// Matchers for the individual message shapes

pub mod dequeue;
pub mod op;
pub mod write;
pub mod read;

pub use dequeue::DequeueMatcher;
pub use op::OpLineMatcher;
pub use write::{DoWriteMatcher, SmallWritePaddingMatcher, SmallWritePlacementMatcher, SmallWriteRangeMatcher};
pub use read::{DoReadMatcher, ReadBlobMatcher};
