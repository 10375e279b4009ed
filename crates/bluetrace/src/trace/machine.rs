//! Machine: the per-thread operation lifecycle state machine.
//!
//! Lines are fed in log order. A `prio` boundary opens a lifecycle on its
//! thread, operation lines attach to it, and a `finish` boundary closes it
//! and hands the finished record back to the caller.

use tracing::{debug, trace, warn};

use crate::parser::model::{DequeueLine, DequeueStage, OffsetLength, OpLine};
use crate::parser::{Classification, LineClassifier, LineMatch, LogLine};

use super::align::{self, DEFAULT_BLOCK_SIZES};
use super::error::TraceError;
use super::metrics::TraceMetrics;
use super::model::{
    BlobAccess, DequeueInfo, DoRead, DoWriteSmall, Operation, SmallWritePlacement, ThreadState,
};
use super::store::ThreadStore;

/// Knobs for the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerOptions {
    pub block_sizes: Vec<u64>,
    /// Keep the verbatim audit trail on every record
    pub record_raw_lines: bool,
    /// Parse both boundary timestamps and fill `elapsed_us`
    pub compute_elapsed: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            block_sizes: DEFAULT_BLOCK_SIZES.to_vec(),
            record_raw_lines: true,
            compute_elapsed: true,
        }
    }
}

/// What processing one line produced.
#[derive(Debug, Default)]
pub struct LineOutcome {
    /// Record closed by a `finish` boundary on this line
    pub emitted: Option<ThreadState>,
    /// Per-line failures; the line's contribution was skipped
    pub errors: Vec<TraceError>,
}

pub struct OpTracker {
    store: ThreadStore,
    classifier: LineClassifier,
    options: TrackerOptions,
    metrics: TraceMetrics,
}

impl OpTracker {
    pub fn new(options: TrackerOptions) -> Self {
        Self {
            store: ThreadStore::new(),
            classifier: LineClassifier::new(),
            options,
            metrics: TraceMetrics::new(),
        }
    }

    pub fn process(&mut self, line: &LogLine<'_>) -> LineOutcome {
        let classification = self.classifier.classify(line.message);
        let recognized = !classification.is_unrecognized();
        self.metrics.record_classified(recognized);
        if !recognized {
            trace!(thread = line.thread, "Unrecognized line");
        }

        let mut outcome = LineOutcome {
            emitted: None,
            errors: classification
                .errors
                .iter()
                .map(|(shape, e)| TraceError::decode(*shape, e.clone()))
                .collect(),
        };

        let boundary = match classification.boundary() {
            Some(LineMatch::Dequeue(boundary)) => Some(boundary.clone()),
            _ => None,
        };
        match boundary {
            Some(boundary) => match boundary.stage {
                DequeueStage::Prio => self.begin(line, &boundary, &classification),
                DequeueStage::Finish => outcome.emitted = self.finish(line, &classification),
            },
            None => self.attach(line, classification, &mut outcome.errors),
        }

        for err in &outcome.errors {
            self.metrics.record_error(err.is_decode());
            warn!(thread = line.thread, line = line.raw, error = %err, "Skipping line contribution");
        }

        outcome
    }

    /// Open a fresh lifecycle, dropping whatever was open on the thread.
    fn begin(&mut self, line: &LogLine<'_>, boundary: &DequeueLine, classification: &Classification) {
        let dequeue = DequeueInfo {
            op_id: boundary.op_id.clone(),
            details: boundary.details.clone(),
        };
        let mut state = ThreadState::started(line.thread, line.timestamp, Some(dequeue));
        if self.options.record_raw_lines {
            state.record_line(line.raw, classification.matches.clone());
        }

        if let Some(previous) = self.store.begin(state) {
            self.metrics.record_discarded();
            debug!(
                thread = line.thread,
                op_id = previous.dequeue.as_ref().map(|d| d.op_id.as_str()).unwrap_or_default(),
                ops = previous.ops.len(),
                "Discarding unfinished lifecycle"
            );
        }
    }

    fn finish(&mut self, line: &LogLine<'_>, classification: &Classification) -> Option<ThreadState> {
        let Some(mut state) = self.store.take(line.thread) else {
            trace!(thread = line.thread, "finish with no open lifecycle");
            return None;
        };

        if self.options.record_raw_lines {
            state.record_line(line.raw, classification.matches.clone());
        }
        state.timestamps.finished_at = Some(line.timestamp.to_string());
        self.close(&mut state);
        Some(state)
    }

    /// Non-boundary line: attach to the open lifecycle, or ignore while idle.
    fn attach(&mut self, line: &LogLine<'_>, classification: Classification, errors: &mut Vec<TraceError>) {
        let Some(state) = self.store.get_mut(line.thread) else {
            return;
        };

        // Shapes are exclusive per line; the first match drives state
        if let Some(first) = classification.matches.first() {
            if let Err(e) = apply(state, first) {
                errors.push(e);
            }
        }

        if self.options.record_raw_lines {
            state.record_line(line.raw, classification.matches);
        }
    }

    fn close(&self, state: &mut ThreadState) {
        align::analyze(&mut state.ops, &self.options.block_sizes);
        if self.options.compute_elapsed {
            state.elapsed_us = state.timestamps.elapsed().and_then(|d| d.num_microseconds());
        }
    }

    /// Close every open lifecycle without a `finish` boundary, in thread-id
    /// order. `finished_at` stays unset.
    pub fn drain(&mut self) -> Vec<ThreadState> {
        let mut states = self.store.drain_sorted();
        for state in states.iter_mut() {
            self.close(state);
        }
        states
    }

    /// Drop every open lifecycle, returning how many there were.
    pub fn abandon(&mut self) -> usize {
        let count = self.store.drain_sorted().len();
        self.metrics.record_abandoned(count);
        count
    }

    pub fn active_threads(&self) -> usize {
        self.store.len()
    }

    pub fn metrics(&self) -> &TraceMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut TraceMetrics {
        &mut self.metrics
    }
}

impl Default for OpTracker {
    fn default() -> Self {
        Self::new(TrackerOptions::default())
    }
}

fn apply(state: &mut ThreadState, matched: &LineMatch) -> Result<(), TraceError> {
    match matched {
        // Boundaries are handled before attach
        LineMatch::Dequeue(_) => Ok(()),
        LineMatch::OpStart(line) => apply_op_start(state, line),
        LineMatch::DoWrite(line) => {
            let op = last_op(state, "_do_write")?;
            if op.do_write.is_some() {
                return Err(TraceError::DuplicateDoWrite);
            }
            op.do_write = Some(line.into());
            Ok(())
        }
        LineMatch::SmallWriteRange { offset, len } => {
            last_op(state, "_do_write_small")?
                .do_write_small
                .push(DoWriteSmall::new(*offset, *len));
            Ok(())
        }
        LineMatch::SmallWritePadding { head_len, tail_len } => {
            let small = last_small_write(state)?;
            small.head_len = Some(*head_len);
            small.tail_len = Some(*tail_len);
            Ok(())
        }
        LineMatch::SmallWritePlacement { placement, offset, len } => {
            last_small_write(state)?.placement = Some(SmallWritePlacement {
                kind: *placement,
                offset: *offset,
                len: *len,
            });
            Ok(())
        }
        LineMatch::DoRead { offset, len, object_size } => {
            last_op(state, "_do_read")?.do_read.push(DoRead {
                offset: *offset,
                len: *len,
                object_size: *object_size,
            });
            Ok(())
        }
        LineMatch::ReadBlob(line) => {
            last_op(state, "_do_read blob")?.blobs.push(BlobAccess::from(line));
            Ok(())
        }
    }
}

fn apply_op_start(state: &mut ThreadState, line: &OpLine) -> Result<(), TraceError> {
    if let Some(done) = line.len_completed {
        let last = state.last_op_mut().ok_or(TraceError::DanglingCompletion)?;
        if last.object_id != line.object_id || last.offset != line.offset || last.len != line.len {
            debug!(
                open = %last.range(),
                completed = %OffsetLength::new(line.offset, line.len),
                "Completion does not repeat the open operation"
            );
        }
        last.len_completed = Some(done);
        return Ok(());
    }

    if let Some(previous) = state.last_op_mut() {
        previous.has_subop = true;
    }
    state.ops.push(Operation::from_line(line));
    Ok(())
}

fn last_op<'a>(state: &'a mut ThreadState, stage: &'static str) -> Result<&'a mut Operation, TraceError> {
    state.last_op_mut().ok_or(TraceError::NoOpenOperation(stage))
}

fn last_small_write(state: &mut ThreadState) -> Result<&mut DoWriteSmall, TraceError> {
    last_op(state, "_do_write_small")?
        .do_write_small
        .last_mut()
        .ok_or(TraceError::NoOpenSmallWrite("_do_write_small"))
}
