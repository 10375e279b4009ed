use std::sync::LazyLock;
use regex::Regex;

use crate::parser::model::{DoWriteLine, SmallWriteKind};
use crate::parser::primitives::{parse_dec, parse_hex, parse_hex_or_decimal_pair, parse_object_id};
use crate::parser::traits::*;

// _do_write #17:d2244b5f:::rbd_data.194a556b8b4567.000000000000011d:head# 0x3c0400~4000 - have 0x400000 (4194304) bytes fadvise_flags 0x20
static DO_WRITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^_do_write (?P<oid>#[^#]*#\S*) (?P<range>[0-9a-fx]+~[0-9a-fx]+) - have (?P<have_hex>[0-9a-fx]+) \((?P<have_dec>\d+)\) bytes fadvise_flags (?P<fadvise>[0-9a-fx]+)",
    )
    .expect("do_write pattern is valid")
});

// _do_write_small 0x6576~9
static SMALL_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^_do_write_small (?P<range>[0-9a-fx]+~[0-9a-fx]+)").expect("do_write_small pattern is valid")
});

// _do_write_small  reading head 0x576 and tail 0x0
static SMALL_PADDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^_do_write_small  reading head (?P<head>[0-9a-fx]+) and tail (?P<tail>[0-9a-fx]+)")
        .expect("do_write_small padding pattern is valid")
});

// _do_write_small  write to unused 0x4000~1000 pad 0x0 + 0x0 of mutable Blob(...)
// _do_write_small  deferred write 0xf000~1000 of mutable Blob(...) at [0x162438b3000~1000]
static SMALL_PLACEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^_do_write_small  (?P<kind>write to unused|deferred write) (?P<range>[0-9a-fx]+~[0-9a-fx]+)")
        .expect("do_write_small placement pattern is valid")
});

pub struct DoWriteMatcher;

impl LineMatcher for DoWriteMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        let caps = DO_WRITE_RE.captures(body)?;
        Some(decode_do_write(&caps))
    }

    fn shape(&self) -> LineShape {
        LineShape::DoWrite
    }
}

fn decode_do_write(caps: &regex::Captures<'_>) -> Result<LineMatch, DecodeError> {
    let object_id = parse_object_id(&caps["oid"])?;
    let range = parse_hex_or_decimal_pair(&caps["range"])?;
    let have_len = parse_hex(&caps["have_hex"])?;
    let have_dec = parse_dec(&caps["have_dec"])?;
    if have_len != have_dec {
        tracing::debug!(have_len, have_dec, "_do_write: hex and decimal object size disagree, using hex");
    }

    Ok(LineMatch::DoWrite(DoWriteLine {
        object_id,
        offset: range.offset,
        len: range.len,
        have_len,
        fadvise_flags: parse_hex(&caps["fadvise"])?,
    }))
}

/// Opens a new small-write sub-event on the current operation.
pub struct SmallWriteRangeMatcher;

impl LineMatcher for SmallWriteRangeMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        let caps = SMALL_RANGE_RE.captures(body)?;
        Some(
            parse_hex_or_decimal_pair(&caps["range"])
                .map(|r| LineMatch::SmallWriteRange { offset: r.offset, len: r.len }),
        )
    }

    fn shape(&self) -> LineShape {
        LineShape::SmallWriteRange
    }
}

pub struct SmallWritePaddingMatcher;

impl LineMatcher for SmallWritePaddingMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        let caps = SMALL_PADDING_RE.captures(body)?;
        let decoded = parse_hex(&caps["head"]).and_then(|head_len| {
            parse_hex(&caps["tail"]).map(|tail_len| LineMatch::SmallWritePadding { head_len, tail_len })
        });
        Some(decoded)
    }

    fn shape(&self) -> LineShape {
        LineShape::SmallWritePadding
    }
}

pub struct SmallWritePlacementMatcher;

impl LineMatcher for SmallWritePlacementMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        let caps = SMALL_PLACEMENT_RE.captures(body)?;
        let placement = SmallWriteKind::from_phrase(&caps["kind"])?;
        Some(
            parse_hex_or_decimal_pair(&caps["range"])
                .map(|r| LineMatch::SmallWritePlacement { placement, offset: r.offset, len: r.len }),
        )
    }

    fn shape(&self) -> LineShape {
        LineShape::SmallWritePlacement
    }
}
