use std::collections::{BTreeMap, HashMap};
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::parser::model::{
    BlobDescriptor, DequeueDetails, DoWriteLine, LineMatch, NeedRange, ObjectId, OffsetLength, OpLine,
    OpType, ReadBlobLine, SmallWriteKind,
};
use crate::parser::serde_utils::serialize_pairs_as_map;

/// Verbatim line and every structured match produced from it.
pub type RawLine = (String, Vec<LineMatch>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl Timestamps {
    /// Time between the two boundaries, if both are present and parseable.
    pub fn elapsed(&self) -> Option<TimeDelta> {
        let started = parse_timestamp(self.started_at.as_deref()?)?;
        let finished = parse_timestamp(self.finished_at.as_deref()?)?;
        Some(finished - started)
    }
}

/// Parse `2020-07-04 12:39:19.590177` or ISO-8601 with an offset.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z")
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Dequeue boundary that opened the lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DequeueInfo {
    pub op_id: String,
    #[serde(flatten)]
    pub details: Option<DequeueDetails>,
}

/// Reconstruction state of one log thread for one operation lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadState {
    pub thread: String,
    pub started: bool,
    pub timestamps: Timestamps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_us: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dequeue: Option<DequeueInfo>,
    #[serde(rename = "lines", serialize_with = "serialize_pairs_as_map")]
    pub raw_lines: Vec<RawLine>,
    pub ops: Vec<Operation>,
    /// Line text → position in `raw_lines`
    #[serde(skip)]
    line_index: HashMap<String, usize>,
}

impl ThreadState {
    /// Fresh lifecycle opened by a `prio` boundary.
    pub fn started(thread: &str, started_at: &str, dequeue: Option<DequeueInfo>) -> Self {
        Self {
            thread: thread.to_string(),
            started: true,
            timestamps: Timestamps {
                started_at: Some(started_at.to_string()),
                finished_at: None,
            },
            elapsed_us: None,
            dequeue,
            raw_lines: Vec::new(),
            ops: Vec::new(),
            line_index: HashMap::new(),
        }
    }

    /// Record a line in the audit trail. A repeated identical line keeps its
    /// first position and takes the newest matches.
    pub fn record_line(&mut self, text: &str, matches: Vec<LineMatch>) {
        match self.line_index.get(text) {
            Some(&pos) => self.raw_lines[pos].1 = matches,
            None => {
                self.line_index.insert(text.to_string(), self.raw_lines.len());
                self.raw_lines.push((text.to_string(), matches));
            }
        }
    }

    pub fn last_op_mut(&mut self) -> Option<&mut Operation> {
        self.ops.last_mut()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Start and end both on a block boundary
    Full,
    /// Start on a boundary, end not
    StartOnly,
    /// Start off a boundary but length a whole number of blocks
    LengthOnly,
}

/// One read/write call inside a lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub op_type: OpType,
    pub pg_id: String,
    pub object_id: ObjectId,
    pub offset: u64,
    pub len: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len_completed: Option<i64>,
    pub has_subop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_write: Option<DoWrite>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub do_write_small: Vec<DoWriteSmall>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub do_read: Vec<DoRead>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blobs: Vec<BlobAccess>,
    /// Keyed by block size; filled in when the lifecycle finishes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub alignment: BTreeMap<u64, Alignment>,
}

impl Operation {
    pub fn from_line(line: &OpLine) -> Self {
        Self {
            op_type: line.op_type,
            pg_id: line.pg_id.clone(),
            object_id: line.object_id.clone(),
            offset: line.offset,
            len: line.len,
            len_completed: line.len_completed,
            has_subop: false,
            do_write: None,
            do_write_small: Vec::new(),
            do_read: Vec::new(),
            blobs: Vec::new(),
            alignment: BTreeMap::new(),
        }
    }

    pub fn range(&self) -> OffsetLength {
        OffsetLength::new(self.offset, self.len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoWrite {
    pub object_id: ObjectId,
    pub offset: u64,
    pub len: u64,
    pub have_len: u64,
    pub fadvise_flags: u64,
}

impl From<&DoWriteLine> for DoWrite {
    fn from(line: &DoWriteLine) -> Self {
        Self {
            object_id: line.object_id.clone(),
            offset: line.offset,
            len: line.len,
            have_len: line.have_len,
            fadvise_flags: line.fadvise_flags,
        }
    }
}

/// Where a small write landed inside its blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SmallWritePlacement {
    pub kind: SmallWriteKind,
    pub offset: u64,
    pub len: u64,
}

/// One small-write sub-event. Later lines of the same sub-event fill in
/// the optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoWriteSmall {
    pub offset: u64,
    pub len: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_len: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_len: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<SmallWritePlacement>,
}

impl DoWriteSmall {
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len, head_len: None, tail_len: None, placement: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DoRead {
    pub offset: u64,
    pub len: u64,
    pub object_size: u64,
}

/// A blob visited while satisfying a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobAccess {
    #[serde(flatten)]
    pub blob: BlobDescriptor,
    pub need_range: NeedRange,
    pub cache_hit_ranges: Vec<OffsetLength>,
}

impl From<&ReadBlobLine> for BlobAccess {
    fn from(line: &ReadBlobLine) -> Self {
        Self {
            blob: line.blob.clone(),
            need_range: line.need,
            cache_hit_ranges: line.cache_has.clone(),
        }
    }
}
