//! Run: the single sequential processing loop.
//!
//! Reads lines in file order, feeds each to the [`OpTracker`] and delivers
//! finished records to an [`Emitter`].

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conf::TraceConfig;
use crate::emit::{EmitError, Emitter, JsonEmitter};
use crate::filter::{FilterEngine, FilterError};
use crate::parser::split_line;
use crate::trace::align::count_not_full;
use crate::trace::{OpTracker, SkipReason, ThreadState, TraceMetrics};

/// Block size reported in the unaligned-ops counter.
const SUMMARY_BLOCK_SIZE: u64 = 4096;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to read input: {0}")]
    Input(#[from] io::Error),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Decides which finished records reach the emitter.
struct Delivery {
    filter: Option<FilterEngine>,
    min_elapsed_us: Option<f64>,
}

impl Delivery {
    fn new(config: &TraceConfig) -> Result<Self, FilterError> {
        let filter = config
            .filter
            .pattern
            .as_deref()
            .map(|pattern| FilterEngine::new(pattern, config.filter.case_sensitive, config.filter.mode))
            .transpose()?;
        Ok(Self {
            filter,
            min_elapsed_us: config.min_elapsed_ms.map(|ms| ms * 1000.0),
        })
    }

    fn keep(&self, record: &ThreadState) -> bool {
        // Records without a measurable elapsed time pass the threshold
        if let (Some(min), Some(us)) = (self.min_elapsed_us, record.elapsed_us) {
            if (us as f64) < min {
                return false;
            }
        }
        self.filter.as_ref().map_or(true, |f| f.should_emit(record))
    }

    fn deliver<E: Emitter>(
        &self,
        record: ThreadState,
        metrics: &mut TraceMetrics,
        emitter: &mut E,
    ) -> Result<(), EmitError> {
        if !self.keep(&record) {
            metrics.record_filtered();
            debug!(thread = %record.thread, "Record filtered out");
            return Ok(());
        }
        metrics.record_emitted(record.ops.len(), count_not_full(&record.ops, SUMMARY_BLOCK_SIZE));
        emitter.emit(record)
    }
}

/// Process `input` to the end, emitting records in `finish` order.
pub fn run<R: BufRead, E: Emitter>(
    config: &TraceConfig,
    mut input: R,
    emitter: &mut E,
) -> Result<TraceMetrics, RunError> {
    let delivery = Delivery::new(config)?;
    let mut tracker = OpTracker::new(config.tracker_options());
    let mut buf = Vec::with_capacity(4096);

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        tracker.metrics_mut().record_read();

        if buf.len() > config.max_line_size {
            warn!(len = buf.len(), max = config.max_line_size, "Skipping oversized line");
            tracker.metrics_mut().record_skip(SkipReason::Oversized);
            continue;
        }

        let text = String::from_utf8_lossy(&buf);
        let Some(line) = split_line(&text) else {
            tracker.metrics_mut().record_skip(SkipReason::Unprefixed);
            continue;
        };

        if let Some(record) = tracker.process(&line).emitted {
            delivery.deliver(record, tracker.metrics_mut(), emitter)?;
        }
    }

    if config.flush_on_eof {
        let open = tracker.drain();
        if !open.is_empty() {
            info!(count = open.len(), "Flushing lifecycles still open at end of input");
        }
        for record in open {
            delivery.deliver(record, tracker.metrics_mut(), emitter)?;
        }
    } else {
        let dropped = tracker.abandon();
        if dropped > 0 {
            info!(count = dropped, "Dropping lifecycles still open at end of input");
        }
    }

    emitter.flush()?;

    let metrics = tracker.metrics().clone();
    info!(
        lines = metrics.lines_read,
        recognized = metrics.lines_recognized,
        emitted = metrics.lifecycles_emitted,
        discarded = metrics.lifecycles_discarded,
        filtered = metrics.lifecycles_filtered,
        abandoned = metrics.lifecycles_abandoned,
        ops = metrics.ops_emitted,
        unaligned_4k = metrics.ops_unaligned_4k,
        errors = metrics.total_errors(),
        "Run complete"
    );
    Ok(metrics)
}

/// Run over a log file, or stdin when `input` is `None`, writing JSON to the
/// configured output (stdout when unset).
pub fn run_path(config: &TraceConfig, input: Option<&Path>) -> Result<TraceMetrics, RunError> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => {
            info!("Reading log from: {}", path.display());
            Box::new(BufReader::new(File::open(path)?))
        }
        None => Box::new(BufReader::new(io::stdin().lock())),
    };

    let writer: Box<dyn Write> = match config.output.path.as_deref() {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut emitter = JsonEmitter::new(writer, config.output.pretty);
    run(config, reader, &mut emitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LOG: &str = "\
2020-07-04 12:39:19.590177 7f92be2ac700 10 osd.160 771412 dequeue_op 0x55c7a60a12c0 prio 63 cost 4096 latency 0.001706 osd_op(client.90197393.0:151501437 17.170) v8
2020-07-04 12:39:19.590180 7f92be2ac700 10 bluestore(/var/lib/ceph/osd/ceph-160) _write 17.5d5_head #17:aba88e4f:::rbd_data.540609ac93f1da.0000000000001818:head# 0x316200~200
2020-07-04 12:39:19.590181 7f92be2ac700 20 bluestore(/var/lib/ceph/osd/ceph-160) _do_write #17:aba88e4f:::rbd_data.540609ac93f1da.0000000000001818:head# 0x316200~200 - have 0x400000 (4194304) bytes fadvise_flags 0x20
2020-07-04 12:39:19.590182 7f92be2ac700 20 bluestore(/var/lib/ceph/osd/ceph-160) _do_write_small 0x316200~200
2020-07-04 12:39:19.590183 7f92be2ac700 20 bluestore(/var/lib/ceph/osd/ceph-160) _do_write_small  reading head 0x0 and tail 0x0
2020-07-04 12:39:19.590184 7f92be2ac700 20 bluestore(/var/lib/ceph/osd/ceph-160) _do_write_small  deferred write 0x2200~200 of mutable Blob(0x1) at [0x162438b3000~1000]
2020-07-04 12:39:19.590185 7f92be2ac700 10 bluestore(/var/lib/ceph/osd/ceph-160) _write 17.5d5_head #17:aba88e4f:::rbd_data.540609ac93f1da.0000000000001818:head# 0x316200~200 = 0
    continuation without a prefix
2020-07-04 12:39:19.790177 7f92be2ac700 10 osd.160 771412 dequeue_op 0x55c7a60a12c0 finish
2020-07-04 12:39:19.800000 7f92c0ab0700 10 osd.160 771413 dequeue_op 0x55c7a60b0000 prio 63 cost 0 latency 0.000100 osd_op(client.1.0:2 17.1) v8
";

    #[test]
    fn test_run_reconstructs_lifecycle() {
        let config = TraceConfig::default();
        let mut sink: Vec<ThreadState> = Vec::new();
        let metrics = run(&config, Cursor::new(LOG), &mut sink).unwrap();

        assert_eq!(sink.len(), 1);
        let record = &sink[0];
        assert_eq!(record.thread, "7f92be2ac700");
        assert_eq!(record.elapsed_us, Some(200_000));
        assert_eq!(record.ops.len(), 1);

        let op = &record.ops[0];
        assert_eq!(op.len_completed, Some(0));
        assert!(op.do_write.is_some());
        assert_eq!(op.do_write_small.len(), 1);
        assert!(op.do_write_small[0].placement.is_some());
        // Audit trail holds every prefixed line of the lifecycle
        assert_eq!(record.raw_lines.len(), 8);

        assert_eq!(metrics.lines_read, 10);
        assert_eq!(metrics.lines_unprefixed, 1);
        assert_eq!(metrics.lifecycles_emitted, 1);
        assert_eq!(metrics.lifecycles_abandoned, 1);
        assert_eq!(metrics.ops_emitted, 1);
        assert_eq!(metrics.ops_unaligned_4k, 1);
        assert_eq!(metrics.total_errors(), 0);
    }

    #[test]
    fn test_run_flush_on_eof() {
        let config = TraceConfig { flush_on_eof: true, ..TraceConfig::default() };
        let mut sink: Vec<ThreadState> = Vec::new();
        let metrics = run(&config, Cursor::new(LOG), &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].thread, "7f92c0ab0700");
        assert!(sink[1].timestamps.finished_at.is_none());
        assert_eq!(metrics.lifecycles_abandoned, 0);
    }

    #[test]
    fn test_run_min_elapsed_filters_fast_lifecycles() {
        let config = TraceConfig { min_elapsed_ms: Some(500.0), ..TraceConfig::default() };
        let mut sink: Vec<ThreadState> = Vec::new();
        let metrics = run(&config, Cursor::new(LOG), &mut sink).unwrap();
        assert!(sink.is_empty());
        assert_eq!(metrics.lifecycles_filtered, 1);

        let config = TraceConfig { min_elapsed_ms: Some(200.0), ..TraceConfig::default() };
        let mut sink: Vec<ThreadState> = Vec::new();
        run(&config, Cursor::new(LOG), &mut sink).unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_run_regex_filter() {
        let mut config = TraceConfig::default();
        config.filter.pattern = Some("deferred write".into());
        let mut sink: Vec<ThreadState> = Vec::new();
        run(&config, Cursor::new(LOG), &mut sink).unwrap();
        assert_eq!(sink.len(), 1);

        config.filter.pattern = Some("write to unused".into());
        let mut sink: Vec<ThreadState> = Vec::new();
        let metrics = run(&config, Cursor::new(LOG), &mut sink).unwrap();
        assert!(sink.is_empty());
        assert_eq!(metrics.lifecycles_filtered, 1);
    }

    #[test]
    fn test_run_invalid_filter_is_fatal() {
        let mut config = TraceConfig::default();
        config.filter.pattern = Some("[oops".into());
        let mut sink: Vec<ThreadState> = Vec::new();
        let err = run(&config, Cursor::new(LOG), &mut sink).unwrap_err();
        assert!(matches!(err, RunError::Filter(_)));
    }

    #[test]
    fn test_run_skips_oversized_lines() {
        let config = TraceConfig { max_line_size: 200, ..TraceConfig::default() };
        let mut sink: Vec<ThreadState> = Vec::new();
        let metrics = run(&config, Cursor::new(LOG), &mut sink).unwrap();

        // The _do_write line is longer than the limit and never reaches the op
        assert!(metrics.lines_oversized >= 1);
        assert_eq!(sink.len(), 1);
        assert!(sink[0].ops[0].do_write.is_none());
    }

    #[test]
    fn test_run_tolerates_invalid_utf8() {
        let mut input = LOG.as_bytes().to_vec();
        input.extend_from_slice(b"2020-07-04 12:39:19.900000 7f92c0ab0700 10 osd.160 \xff\xfe junk\n");
        let config = TraceConfig::default();
        let mut sink: Vec<ThreadState> = Vec::new();
        let metrics = run(&config, Cursor::new(input), &mut sink).unwrap();
        assert_eq!(metrics.lines_read, 11);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_run_path_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("osd.log");
        let out_path = dir.path().join("out.jsonl");
        std::fs::write(&log_path, LOG).unwrap();

        let mut config = TraceConfig { flush_on_eof: true, ..TraceConfig::default() };
        config.output.path = Some(out_path.to_str().unwrap().to_string());
        let metrics = run_path(&config, Some(&log_path)).unwrap();
        assert_eq!(metrics.lifecycles_emitted, 2);

        let out = std::fs::read_to_string(&out_path).unwrap();
        let records: Vec<serde_json::Value> =
            out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["ops"][0]["op_type"], "write");
        assert_eq!(records[0]["ops"][0]["alignment"]["512"], "full");
    }

    #[test]
    fn test_run_path_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_path(&TraceConfig::default(), Some(&dir.path().join("absent.log"))).unwrap_err();
        assert!(matches!(err, RunError::Input(_)));
    }
}
