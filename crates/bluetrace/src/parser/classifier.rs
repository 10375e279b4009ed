use super::traits::*;
use super::formats::*;
use super::model::DequeueLine;

/// Outcome of running every matcher over one message body.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Successful matches, in matcher priority order
    pub matches: Vec<LineMatch>,
    /// Shapes that applied but failed to decode
    pub errors: Vec<(LineShape, DecodeError)>,
}

impl Classification {
    /// No matcher applied. This is the normal outcome for most lines.
    pub fn is_unrecognized(&self) -> bool {
        self.matches.is_empty() && self.errors.is_empty()
    }

    /// The lifecycle boundary match, if any. Boundaries never share a line
    /// with operation shapes.
    pub fn boundary(&self) -> Option<&LineMatch> {
        self.matches.iter().find(|m| m.shape() == LineShape::Dequeue)
    }
}

/// Ordered line classifier.
///
/// Every matcher is tried on every body and each success is kept, so the
/// audit trail records all extractors that fired. The shapes are mutually
/// exclusive by construction, so at most one drives state in practice.
pub struct LineClassifier {
    matchers: Vec<Box<dyn LineMatcher>>,
}

impl LineClassifier {
    pub fn new() -> Self {
        let matchers: Vec<Box<dyn LineMatcher>> = vec![
            // Order matters! Boundaries first, then the op, then its sub-steps
            Box::new(DequeueMatcher),
            Box::new(OpLineMatcher),
            Box::new(DoWriteMatcher),
            Box::new(SmallWriteRangeMatcher),
            Box::new(SmallWritePaddingMatcher),
            Box::new(SmallWritePlacementMatcher),
            Box::new(DoReadMatcher),
            Box::new(ReadBlobMatcher),
        ];

        Self { matchers }
    }

    pub fn classify(&self, body: &str) -> Classification {
        let mut result = Classification::default();

        for matcher in &self.matchers {
            match matcher.try_match(body) {
                Some(Ok(m)) => {
                    // A match can carry a failure in one of its optional parts
                    if let LineMatch::Dequeue(DequeueLine { details_error: Some(e), .. }) = &m {
                        result.errors.push((matcher.shape(), e.clone()));
                    }
                    result.matches.push(m)
                }
                Some(Err(e)) => result.errors.push((matcher.shape(), e)),
                None => {}
            }
        }

        result
    }

    pub fn shapes(&self) -> Vec<LineShape> {
        self.matchers.iter().map(|m| m.shape()).collect()
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}
