use serde::Serialize;

/// Why a line was skipped before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No daemon prefix (continuation, blank, foreign text)
    Unprefixed,
    /// Longer than the configured maximum line size
    Oversized,
}

/// Counters for one reconstruction run.
///
/// Owned by the single processing loop, so plain integers are enough. The
/// struct serializes as-is for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceMetrics {
    // Input
    pub lines_read: u64,
    pub lines_unprefixed: u64,
    pub lines_oversized: u64,
    pub lines_recognized: u64,
    pub lines_unrecognized: u64,

    // Errors
    pub decode_errors: u64,
    pub state_errors: u64,

    // Lifecycles
    pub lifecycles_emitted: u64,
    pub lifecycles_discarded: u64,
    pub lifecycles_filtered: u64,
    pub lifecycles_abandoned: u64,

    // Operations inside emitted lifecycles
    pub ops_emitted: u64,
    pub ops_unaligned_4k: u64,
}

impl TraceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_read(&mut self) {
        self.lines_read += 1;
    }

    #[inline]
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Unprefixed => self.lines_unprefixed += 1,
            SkipReason::Oversized => self.lines_oversized += 1,
        }
    }

    /// Record the classifier verdict for one prefixed line.
    #[inline]
    pub fn record_classified(&mut self, recognized: bool) {
        if recognized {
            self.lines_recognized += 1;
        } else {
            self.lines_unrecognized += 1;
        }
    }

    #[inline]
    pub fn record_error(&mut self, is_decode: bool) {
        if is_decode {
            self.decode_errors += 1;
        } else {
            self.state_errors += 1;
        }
    }

    /// Record an emitted lifecycle with its op count and how many ops were
    /// not 4096-aligned at both ends.
    pub fn record_emitted(&mut self, ops: usize, unaligned_4k: usize) {
        self.lifecycles_emitted += 1;
        self.ops_emitted += ops as u64;
        self.ops_unaligned_4k += unaligned_4k as u64;
    }

    #[inline]
    pub fn record_discarded(&mut self) {
        self.lifecycles_discarded += 1;
    }

    #[inline]
    pub fn record_filtered(&mut self) {
        self.lifecycles_filtered += 1;
    }

    pub fn record_abandoned(&mut self, count: usize) {
        self.lifecycles_abandoned += count as u64;
    }

    pub fn total_errors(&self) -> u64 {
        self.decode_errors + self.state_errors
    }
}
