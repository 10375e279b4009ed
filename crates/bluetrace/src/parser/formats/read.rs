use std::sync::LazyLock;
use regex::Regex;

use crate::parser::blob::parse_blob_descriptor;
use crate::parser::model::{NeedRange, ReadBlobLine};
use crate::parser::primitives::{parse_dec, parse_hex, parse_hex_or_decimal_pair, parse_range_list};
use crate::parser::traits::*;

// _do_read 0x0~16 size 0x16 (22)
static DO_READ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^_do_read (?P<range>[0-9a-fx]+~[0-9a-fx]+) size (?P<size_hex>[0-9a-fx]+) \((?P<size_dec>\d+)\)")
        .expect("do_read pattern is valid")
});

// _do_read  blob Blob(...) need 0x6000~200 cache has 0x[]
// _do_read  blob Blob(...) need 0x4b000:b000~1000
static READ_BLOB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^_do_read  blob Blob\((?P<blob>.*)\) need ",
        r"(?:(?P<logical>[0-9a-fx]+):)?(?P<need>[0-9a-fx]+~[0-9a-fx]+)",
        r"(?: cache has 0x\[(?P<cache>[^\]]*)\])?",
    ))
    .expect("do_read blob pattern is valid")
});

pub struct DoReadMatcher;

impl LineMatcher for DoReadMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        let caps = DO_READ_RE.captures(body)?;
        Some(decode_do_read(&caps))
    }

    fn shape(&self) -> LineShape {
        LineShape::DoRead
    }
}

fn decode_do_read(caps: &regex::Captures<'_>) -> Result<LineMatch, DecodeError> {
    let range = parse_hex_or_decimal_pair(&caps["range"])?;
    let object_size = parse_hex(&caps["size_hex"])?;
    let size_dec = parse_dec(&caps["size_dec"])?;
    if object_size != size_dec {
        tracing::debug!(object_size, size_dec, "_do_read: hex and decimal object size disagree, using hex");
    }
    Ok(LineMatch::DoRead { offset: range.offset, len: range.len, object_size })
}

/// Blob visited while satisfying a read, with its cache state.
pub struct ReadBlobMatcher;

impl LineMatcher for ReadBlobMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        let caps = READ_BLOB_RE.captures(body)?;
        Some(decode_read_blob(&caps))
    }

    fn shape(&self) -> LineShape {
        LineShape::ReadBlob
    }
}

fn decode_read_blob(caps: &regex::Captures<'_>) -> Result<LineMatch, DecodeError> {
    let blob = parse_blob_descriptor(&caps["blob"])?;
    let range = parse_hex_or_decimal_pair(&caps["need"])?;
    let logical_offset = caps.name("logical").map(|m| parse_hex(m.as_str())).transpose()?;
    let cache_has = caps
        .name("cache")
        .map(|m| parse_range_list(m.as_str()))
        .transpose()?
        .unwrap_or_default();

    Ok(LineMatch::ReadBlob(ReadBlobLine {
        blob,
        need: NeedRange { logical_offset, offset: range.offset, len: range.len },
        cache_has,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::model::{ExtentOffset, OffsetLength};

    fn read_blob(body: &str) -> ReadBlobLine {
        match ReadBlobMatcher.try_match(body) {
            Some(Ok(LineMatch::ReadBlob(line))) => line,
            other => panic!("expected blob read match, got {:?}", other),
        }
    }

    #[test]
    fn test_match_do_read() {
        assert_eq!(
            DoReadMatcher.try_match("_do_read 0x0~16 size 0x16 (22)").unwrap().unwrap(),
            LineMatch::DoRead { offset: 0, len: 0x16, object_size: 0x16 }
        );
        assert!(DoReadMatcher.try_match("_do_read  blob Blob(0x1) need 0x0~1").is_none());
    }

    #[test]
    fn test_match_blob_with_empty_cache() {
        let line = read_blob(
            "_do_read  blob Blob(0x56342362d250 blob([0x81eb46ec000~4000,0x5e743e14000~4000] csum crc32c/0x1000) use_tracker(0x2*0x4000 0x[4000,2400]) SharedBlob(0x56342362b5e0 sbid 0x0)) need 0x6000~200 cache has 0x[]",
        );
        assert_eq!(line.blob.blob_id, 0x56342362d250);
        assert_eq!(line.need, NeedRange { logical_offset: None, offset: 0x6000, len: 0x200 });
        assert!(line.cache_has.is_empty());
    }

    #[test]
    fn test_match_blob_with_cache_hit() {
        let line = read_blob(
            "_do_read  blob Blob(0x5633f0146b50 blob([0x87d3a9c8000~4000,0x87da9b84000~4000,0x87dac5c0000~4000,0x1bac79f8000~4000] csum crc32c/0x1000) use_tracker(0x4*0x4000 0x[4000,4000,4000,4000]) SharedBlob(0x5633cdd3a0d0 sbid 0x0)) need 0x6000~600 cache has 0x[6000~600]",
        );
        assert_eq!(line.blob.extents.len(), 4);
        assert_eq!(line.cache_has, vec![OffsetLength::new(0x6000, 0x600)]);
    }

    #[test]
    fn test_match_blob_with_logical_offset() {
        let line = read_blob(
            "_do_read  blob Blob(0x56339265e4d0 blob([!~8000,0x8c97ad84000~4000] csum crc32c/0x1000) use_tracker(0x3*0x4000 0x[0,0,4000]) SharedBlob(0x56339265f340 sbid 0x0)) need 0x4b000:b000~1000",
        );
        assert_eq!(line.need.logical_offset, Some(0x4b000));
        assert_eq!(line.need.offset, 0xb000);
        assert_eq!(line.need.len, 0x1000);
        assert_eq!(line.blob.extents[0].offset, ExtentOffset::Unallocated);
        assert!(line.cache_has.is_empty());
    }

    #[test]
    fn test_malformed_blob_is_decode_error() {
        let result = ReadBlobMatcher
            .try_match("_do_read  blob Blob(0x5634 something else) need 0x6000~200 cache has 0x[]")
            .unwrap();
        assert!(matches!(result, Err(DecodeError::MalformedBlobDescriptor(_))));
    }
}
