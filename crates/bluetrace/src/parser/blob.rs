//! Blob: decoder for the blob descriptor printed by read and small-write paths.
//!
//! ```text
//! Blob(0x5633f0146b50 spanning 0 blob([0x87d3a9c8000~4000,!~4000] csum+shared crc32c/0x1000)
//!      use_tracker(0x2*0x4000 0x[4000,2400]) SharedBlob(0x5633cdd3a0d0 sbid 0x0))
//! ```
//!
//! Every hex field is normalized to an integer. A descriptor that does not fit
//! the grammar yields `MalformedBlobDescriptor`, which callers treat as "not a
//! blob line" rather than a fatal condition.

use std::sync::LazyLock;
use regex::Regex;

use super::model::{BlobDescriptor, DecodeError, SharedBlobRef, SharedBlobState, TrackerShape, UseTracker};
use super::primitives::{parse_dec, parse_extent_list, parse_hex, parse_ref_map};

static BLOB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:Blob\()?(?P<blob_id>(?:0x)?[0-9a-f]+)",
        r"(?: spanning (?P<span>\d+))?",
        r" blob\(\[(?P<extents>[^\]]*)\]",
        r" csum(?:\+(?P<flags>[a-z_+]+))? (?P<algo>[^\s/]+)/(?P<chunk>(?:0x)?[0-9a-f]+)",
        r"(?: unused=(?P<unused>(?:0x)?[0-9a-f]+))?\)",
        r" use_tracker\((?P<tracker>[^)]*)\)",
        r" SharedBlob\((?P<sb_handle>(?:0x)?[0-9a-f]+) (?P<sb>.+)$",
    ))
    .expect("blob descriptor pattern is valid")
});

/// Decode a blob descriptor, with or without its leading `Blob(` marker.
///
/// Any failure inside the descriptor, numeric fields included, is reported
/// as `MalformedBlobDescriptor`.
pub fn parse_blob_descriptor(text: &str) -> Result<BlobDescriptor, DecodeError> {
    decode_blob_descriptor(text).map_err(|e| match e {
        DecodeError::MalformedBlobDescriptor(_) => e,
        other => DecodeError::MalformedBlobDescriptor(other.to_string()),
    })
}

fn decode_blob_descriptor(text: &str) -> Result<BlobDescriptor, DecodeError> {
    let caps = BLOB_RE.captures(text).ok_or_else(|| {
        DecodeError::MalformedBlobDescriptor(format!("structure mismatch: {:?}", text))
    })?;

    // Groups without `?` in the pattern are always present on a match.
    let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or_default();

    let blob_id = parse_hex(group("blob_id"))?;
    let span_count = caps
        .name("span")
        .map(|m| parse_dec(m.as_str()))
        .transpose()?
        .map(|n| {
            u32::try_from(n)
                .map_err(|_| DecodeError::MalformedNumber(format!("span count too large: {}", n)))
        })
        .transpose()?;

    let extents = parse_extent_list(group("extents")).map_err(|e| {
        DecodeError::MalformedBlobDescriptor(format!("extent list: {}", e))
    })?;

    let flags: Vec<&str> = caps
        .name("flags")
        .map(|m| m.as_str().split('+').collect())
        .unwrap_or_default();

    let unused_mask = caps.name("unused").map(|m| parse_hex(m.as_str())).transpose()?;

    let tracker_raw = group("tracker");
    let use_tracker = UseTracker {
        raw: tracker_raw.to_string(),
        shape: parse_tracker_shape(tracker_raw),
    };

    let shared_reference = SharedBlobRef {
        handle: parse_hex(group("sb_handle"))?,
        state: parse_shared_blob_state(group("sb"))?,
    };

    Ok(BlobDescriptor {
        blob_id,
        span_count,
        extents,
        checksum_algorithm: group("algo").to_string(),
        checksum_chunk_size: parse_hex(group("chunk"))?,
        shared_checksum: flags.contains(&"shared"),
        has_unused: flags.contains(&"has_unused"),
        unused_mask,
        use_tracker,
        shared_reference,
    })
}

/// `sbid 0x0` or `loaded (sbid 0x8027a6 ref_map(0x30519e54000~10000=2))`, with
/// any closing parentheses of the enclosing descriptor still attached.
fn parse_shared_blob_state(text: &str) -> Result<SharedBlobState, DecodeError> {
    let body = text.trim_end().trim_end_matches(')');

    if let Some(sbid) = body.strip_prefix("sbid ") {
        return Ok(SharedBlobState::Bare { sbid: parse_hex(sbid)? });
    }

    if let Some(loaded) = body.strip_prefix("loaded (sbid ") {
        let (sbid, ref_map) = loaded.split_once(" ref_map(").ok_or_else(|| {
            DecodeError::MalformedBlobDescriptor(format!("loaded shared blob without ref_map: {:?}", text))
        })?;
        return Ok(SharedBlobState::Loaded {
            sbid: parse_hex(sbid)?,
            ref_map: parse_ref_map(ref_map)?,
        });
    }

    Err(DecodeError::MalformedBlobDescriptor(format!("unknown shared blob state: {:?}", text)))
}

/// Best-effort split of the tracker text; `None` leaves only the raw form.
fn parse_tracker_shape(raw: &str) -> Option<TrackerShape> {
    let (head, tail) = raw.split_once(' ')?;

    if let Some((count, chunk_size)) = head.split_once('*') {
        let list = tail.strip_prefix("0x[")?.strip_suffix(']')?;
        let used = list
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| parse_hex(s).ok())
            .collect::<Option<Vec<u64>>>()?;
        return Some(TrackerShape::Chunked {
            count: parse_hex(count).ok()?,
            chunk_size: parse_hex(chunk_size).ok()?,
            used,
        });
    }

    Some(TrackerShape::Total {
        chunk_size: parse_hex(head).ok()?,
        total: parse_hex(tail).ok()?,
    })
}
