use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// Known message shapes, in classifier priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineShape {
    /// `dequeue_op <id> prio|finish` lifecycle boundary
    Dequeue,
    /// `read` / `_write` with the op range and optional result
    OpStart,
    /// `_do_write <oid> <range> - have ...`
    DoWrite,
    /// `_do_write_small <range>`
    SmallWriteRange,
    /// `_do_write_small  reading head .. and tail ..`
    SmallWritePadding,
    /// `_do_write_small  write to unused|deferred write <range>`
    SmallWritePlacement,
    /// `_do_read <range> size ..`
    DoRead,
    /// `_do_read  blob Blob(..) need ..`
    ReadBlob,
}

impl LineShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineShape::Dequeue => "dequeue",
            LineShape::OpStart => "op_start",
            LineShape::DoWrite => "do_write",
            LineShape::SmallWriteRange => "do_write_small_range",
            LineShape::SmallWritePadding => "do_write_small_padding",
            LineShape::SmallWritePlacement => "do_write_small_placement",
            LineShape::DoRead => "do_read",
            LineShape::ReadBlob => "do_read_blob",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed range: {0}")]
    MalformedRange(String),

    #[error("Malformed object id: {0}")]
    MalformedObjectId(String),

    #[error("Malformed blob descriptor: {0}")]
    MalformedBlobDescriptor(String),

    #[error("Malformed number: {0}")]
    MalformedNumber(String),
}

/// An `offset~length` pair. Both sides are hexadecimal in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OffsetLength {
    pub offset: u64,
    pub len: u64,
}

impl OffsetLength {
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    /// Exclusive end of the range, `None` on 64-bit overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.len)
    }
}

impl fmt::Display for OffsetLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}~0x{:x}", self.offset, self.len)
    }
}

/// Object descriptor `#<pool>:<hash>:<namespace>::<name>:<snap>#<generation>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectId {
    pub pool: i64,
    pub hash: String,
    pub namespace: String,
    pub name: String,
    pub snap: String,
    pub generation: String,
}

/// Start of a blob extent. `!` in the log marks a hole with no disk backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtentOffset {
    Allocated(u64),
    Unallocated,
}

impl ExtentOffset {
    pub fn is_allocated(&self) -> bool {
        matches!(self, ExtentOffset::Allocated(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub offset: ExtentOffset,
    pub len: u64,
}

/// Tracker text split into its printed shape. The per-chunk counts are not
/// interpreted any further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TrackerShape {
    /// `0x<count>*0x<chunk_size> 0x[<used>,...]`
    Chunked { count: u64, chunk_size: u64, used: Vec<u64> },
    /// `0x<chunk_size> 0x<total>`
    Total { chunk_size: u64, total: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UseTracker {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<TrackerShape>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefMapEntry {
    pub offset: u64,
    pub len: u64,
    pub refs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SharedBlobState {
    /// `sbid 0x0` - no reference map loaded
    Bare { sbid: u64 },
    /// `loaded (sbid X ref_map(...))`
    Loaded { sbid: u64, ref_map: Vec<RefMapEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedBlobRef {
    /// In-memory handle, an identity token only
    pub handle: u64,
    #[serde(flatten)]
    pub state: SharedBlobState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobDescriptor {
    /// In-memory handle, an identity token only
    pub blob_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_count: Option<u32>,
    pub extents: Vec<Extent>,
    pub checksum_algorithm: String,
    pub checksum_chunk_size: u64,
    pub shared_checksum: bool,
    pub has_unused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unused_mask: Option<u64>,
    pub use_tracker: UseTracker,
    pub shared_reference: SharedBlobRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    Read,
    Write,
}

impl OpType {
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "read" => Some(OpType::Read),
            "_write" => Some(OpType::Write),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DequeueStage {
    Prio,
    Finish,
}

/// Queueing details printed on the `prio` boundary line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DequeueDetails {
    pub priority: u32,
    pub cost: u64,
    pub latency: f64,
    pub op_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DequeueLine {
    pub op_id: String,
    pub stage: DequeueStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<DequeueDetails>,
    /// Why `details` is missing even though the line printed them
    #[serde(skip)]
    pub details_error: Option<DecodeError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpLine {
    pub op_type: OpType,
    pub pg_id: String,
    pub object_id: ObjectId,
    pub offset: u64,
    pub len: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len_completed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoWriteLine {
    pub object_id: ObjectId,
    pub offset: u64,
    pub len: u64,
    pub have_len: u64,
    pub fadvise_flags: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmallWriteKind {
    WriteToUnused,
    DeferredWrite,
}

impl SmallWriteKind {
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        match phrase {
            "write to unused" => Some(SmallWriteKind::WriteToUnused),
            "deferred write" => Some(SmallWriteKind::DeferredWrite),
            _ => None,
        }
    }
}

/// Range requested from a blob, optionally prefixed by its logical offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NeedRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_offset: Option<u64>,
    pub offset: u64,
    pub len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadBlobLine {
    pub blob: BlobDescriptor,
    pub need: NeedRange,
    pub cache_has: Vec<OffsetLength>,
}

/// Structured result of one matcher firing on one message body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineMatch {
    Dequeue(DequeueLine),
    OpStart(OpLine),
    DoWrite(DoWriteLine),
    SmallWriteRange { offset: u64, len: u64 },
    SmallWritePadding { head_len: u64, tail_len: u64 },
    SmallWritePlacement { placement: SmallWriteKind, offset: u64, len: u64 },
    DoRead { offset: u64, len: u64, object_size: u64 },
    ReadBlob(ReadBlobLine),
}

impl LineMatch {
    pub fn shape(&self) -> LineShape {
        match self {
            LineMatch::Dequeue(_) => LineShape::Dequeue,
            LineMatch::OpStart(_) => LineShape::OpStart,
            LineMatch::DoWrite(_) => LineShape::DoWrite,
            LineMatch::SmallWriteRange { .. } => LineShape::SmallWriteRange,
            LineMatch::SmallWritePadding { .. } => LineShape::SmallWritePadding,
            LineMatch::SmallWritePlacement { .. } => LineShape::SmallWritePlacement,
            LineMatch::DoRead { .. } => LineShape::DoRead,
            LineMatch::ReadBlob(_) => LineShape::ReadBlob,
        }
    }
}
