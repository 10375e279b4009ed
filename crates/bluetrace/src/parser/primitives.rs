//! Primitives: atomic sub-grammars shared by all line matchers.

use super::model::{DecodeError, Extent, ExtentOffset, ObjectId, OffsetLength, RefMapEntry};

/// Marker printed in place of an extent offset when the blob region has no disk backing.
pub const UNALLOCATED_MARKER: &str = "!";

/// Parse an unsigned hex number with or without a `0x` prefix.
pub fn parse_hex(text: &str) -> Result<u64, DecodeError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::MalformedNumber(format!("not hex: {:?}", text)));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| DecodeError::MalformedNumber(format!("{:?}: {}", text, e)))
}

pub fn parse_dec(text: &str) -> Result<u64, DecodeError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::MalformedNumber(format!("not decimal: {:?}", text)));
    }
    text.parse()
        .map_err(|e| DecodeError::MalformedNumber(format!("{:?}: {}", text, e)))
}

/// Parse an `offset~length` pair, both sides hexadecimal.
///
/// The range must fit in 64 bits: `offset + len` overflowing is rejected.
pub fn parse_hex_or_decimal_pair(text: &str) -> Result<OffsetLength, DecodeError> {
    let (offset, len) = text
        .split_once('~')
        .ok_or_else(|| DecodeError::MalformedRange(format!("missing '~' in {:?}", text)))?;

    let offset = parse_hex(offset)
        .map_err(|_| DecodeError::MalformedRange(format!("bad offset in {:?}", text)))?;
    let len = parse_hex(len)
        .map_err(|_| DecodeError::MalformedRange(format!("bad length in {:?}", text)))?;

    let range = OffsetLength::new(offset, len);
    if range.end().is_none() {
        return Err(DecodeError::MalformedRange(format!("range overflows 64 bits: {:?}", text)));
    }
    Ok(range)
}

/// Parse one blob extent. The offset side may be the unallocated marker.
pub fn parse_extent(text: &str) -> Result<Extent, DecodeError> {
    let (offset, len) = text
        .split_once('~')
        .ok_or_else(|| DecodeError::MalformedRange(format!("missing '~' in extent {:?}", text)))?;

    let offset = if offset == UNALLOCATED_MARKER {
        ExtentOffset::Unallocated
    } else {
        ExtentOffset::Allocated(
            parse_hex(offset)
                .map_err(|_| DecodeError::MalformedRange(format!("bad extent offset in {:?}", text)))?,
        )
    };
    let len = parse_hex(len)
        .map_err(|_| DecodeError::MalformedRange(format!("bad extent length in {:?}", text)))?;

    Ok(Extent { offset, len })
}

/// Parse a comma-separated extent list. Positions are preserved, holes included.
pub fn parse_extent_list(text: &str) -> Result<Vec<Extent>, DecodeError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',').map(parse_extent).collect()
}

/// Parse a comma-separated list of `offset~length` pairs (e.g. the `cache has` set).
pub fn parse_range_list(text: &str) -> Result<Vec<OffsetLength>, DecodeError> {
    text.split(',')
        .filter(|s| !s.is_empty())
        .map(parse_hex_or_decimal_pair)
        .collect()
}

/// Parse a shared-blob reference map: `0x<off>~<len>=<refs>,...` (refs in decimal).
pub fn parse_ref_map(text: &str) -> Result<Vec<RefMapEntry>, DecodeError> {
    text.split(',')
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (range, refs) = entry.rsplit_once('=').ok_or_else(|| {
                DecodeError::MalformedBlobDescriptor(format!("ref_map entry without '=': {:?}", entry))
            })?;
            let range = parse_hex_or_decimal_pair(range)?;
            let refs = parse_dec(refs)?;
            let refs = u32::try_from(refs)
                .map_err(|_| DecodeError::MalformedNumber(format!("ref count too large: {}", refs)))?;
            Ok(RefMapEntry { offset: range.offset, len: range.len, refs })
        })
        .collect()
}

/// Parse `#<pool>:<hash>:<namespace>::<name>:<snap>#<generation>`.
pub fn parse_object_id(text: &str) -> Result<ObjectId, DecodeError> {
    let malformed = |why: &str| DecodeError::MalformedObjectId(format!("{}: {:?}", why, text));

    let inner = text.strip_prefix('#').ok_or_else(|| malformed("missing leading '#'"))?;
    let (body, generation) = inner
        .rsplit_once('#')
        .ok_or_else(|| malformed("missing generation separator '#'"))?;

    let segments: Vec<&str> = body.split(':').collect();
    // pool, hash, namespace, <empty>, name, snap
    if segments.len() != 6 || !segments[3].is_empty() {
        return Err(malformed("wrong segment count"));
    }

    let pool_text = segments[0];
    let pool: i64 = if !pool_text.is_empty()
        && pool_text.trim_start_matches('-').bytes().all(|b| b.is_ascii_digit())
    {
        pool_text.parse().map_err(|_| malformed("bad pool id"))?
    } else {
        return Err(malformed("bad pool id"));
    };

    let hash = segments[1];
    if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed("bad hash"));
    }
    if segments[4].is_empty() {
        return Err(malformed("empty object name"));
    }

    Ok(ObjectId {
        pool,
        hash: hash.to_string(),
        namespace: segments[2].to_string(),
        name: segments[4].to_string(),
        snap: segments[5].to_string(),
        generation: generation.to_string(),
    })
}
