/// Line parsing for the storage daemon's debug log
///
/// Turns one prefixed log line into zero or more structured matches.
///
/// # Architecture
///
/// - `prefix.rs`: splits `timestamp thread level logger` from the message body
/// - `primitives.rs`: hex numbers, `offset~length` pairs, object ids, extent lists
/// - `blob.rs`: the blob descriptor grammar
/// - `formats/`: one matcher per known message shape
/// - `classifier.rs`: ordered matcher cascade
///
/// Decoders never panic on input; every structural failure comes back as a
/// [`DecodeError`] that the caller can log and skip.

pub mod traits;
pub mod model;
pub mod primitives;
pub mod blob;
pub mod prefix;
pub mod formats;
pub mod classifier;
pub(crate) mod serde_utils;

// Re-export commonly used types
pub use traits::LineMatcher;
pub use model::{DecodeError, LineMatch, LineShape};
pub use classifier::{Classification, LineClassifier};
pub use prefix::{split_line, LogLine};
pub use primitives::{parse_hex_or_decimal_pair, parse_object_id};
pub use blob::parse_blob_descriptor;

// Constants
pub const MAX_LINE_SIZE: usize = 1_048_576; // 1MB
