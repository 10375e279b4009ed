use std::io::Write;

use tracing::trace;

use super::{EmitError, Emitter};
use crate::trace::ThreadState;

/// Writes each record as JSON.
///
/// Compact mode writes one record per line (JSON lines). Pretty mode writes
/// indented documents separated by a newline.
pub struct JsonEmitter<W: Write> {
    writer: W,
    pretty: bool,
    written: u64,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W, pretty: bool) -> Self {
        Self { writer, pretty, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Emitter for JsonEmitter<W> {
    fn emit(&mut self, record: ThreadState) -> Result<(), EmitError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, &record)?;
        } else {
            serde_json::to_writer(&mut self.writer, &record)?;
        }
        self.writer.write_all(b"\n")?;
        self.written += 1;
        trace!(thread = %record.thread, ops = record.ops.len(), "Record written");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EmitError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(thread: &str) -> ThreadState {
        let mut state = ThreadState::started(thread, "2020-07-04 12:39:19.590177", None);
        state.timestamps.finished_at = Some("2020-07-04 12:39:19.790177".into());
        state.record_line("a line", vec![]);
        state
    }

    #[test]
    fn test_compact_writes_json_lines() {
        let mut emitter = JsonEmitter::new(Vec::new(), false);
        emitter.emit(record("7f01")).unwrap();
        emitter.emit(record("7f02")).unwrap();
        emitter.flush().unwrap();
        assert_eq!(emitter.written(), 2);

        let out = String::from_utf8(emitter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["thread"], "7f01");
        assert_eq!(first["timestamps"]["finished_at"], "2020-07-04 12:39:19.790177");
        assert!(first["lines"]["a line"].is_array());
    }

    #[test]
    fn test_pretty_writes_indented_documents() {
        let mut emitter = JsonEmitter::new(Vec::new(), true);
        emitter.emit(record("7f01")).unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();

        assert!(out.contains("\n  \"thread\": \"7f01\""));
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["ops"], serde_json::json!([]));
    }
}
