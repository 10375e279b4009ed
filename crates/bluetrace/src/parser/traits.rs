pub use super::model::{DecodeError, LineMatch, LineShape};

pub trait LineMatcher: Send + Sync {
    /// Match one message body against this shape.
    ///
    /// `None` means the shape does not apply. `Some(Err(_))` means the shape
    /// applied but an embedded field failed to decode.
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>>;
    fn shape(&self) -> LineShape;
}
