use std::sync::LazyLock;
use regex::Regex;

use crate::parser::model::{OpLine, OpType};
use crate::parser::primitives::{parse_hex_or_decimal_pair, parse_object_id};
use crate::parser::traits::*;

// _write 17.5d5_head #17:aba88e4f:::rbd_data.540609ac93f1da.0000000000001818:head# 0x316200~200
// _write 17.5d5_head #17:aba88e4f:::rbd_data.540609ac93f1da.0000000000001818:head# 0x316200~200 = 512
static OP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<verb>read|_write) (?P<pg_id>\S+) (?P<oid>#[^#]*#\S*) (?P<range>[0-9a-fx]+~[0-9a-fx]+)(?: = (?P<done>-?\d+))?",
    )
    .expect("op pattern is valid")
});

/// Top-level read/write call. A trailing `= <n>` marks the completion line.
pub struct OpLineMatcher;

impl LineMatcher for OpLineMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        let caps = OP_RE.captures(body)?;
        let op_type = OpType::from_verb(&caps["verb"])?;
        Some(decode(op_type, &caps))
    }

    fn shape(&self) -> LineShape {
        LineShape::OpStart
    }
}

fn decode(op_type: OpType, caps: &regex::Captures<'_>) -> Result<LineMatch, DecodeError> {
    let object_id = parse_object_id(&caps["oid"])?;
    let range = parse_hex_or_decimal_pair(&caps["range"])?;
    let len_completed = caps
        .name("done")
        .map(|m| {
            m.as_str()
                .parse::<i64>()
                .map_err(|_| DecodeError::MalformedNumber(format!("bad result: {:?}", m.as_str())))
        })
        .transpose()?;

    Ok(LineMatch::OpStart(OpLine {
        op_type,
        pg_id: caps["pg_id"].to_string(),
        object_id,
        offset: range.offset,
        len: range.len,
        len_completed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OID: &str = "#17:aba88e4f:::rbd_data.540609ac93f1da.0000000000001818:head#";

    fn op(body: &str) -> OpLine {
        match OpLineMatcher.try_match(body) {
            Some(Ok(LineMatch::OpStart(line))) => line,
            other => panic!("expected op match, got {:?}", other),
        }
    }

    #[test]
    fn test_match_write_start() {
        let line = op(&format!("_write 17.5d5_head {} 0x316200~200", OID));
        assert_eq!(line.op_type, OpType::Write);
        assert_eq!(line.pg_id, "17.5d5_head");
        assert_eq!(line.object_id.name, "rbd_data.540609ac93f1da.0000000000001818");
        assert_eq!(line.offset, 0x316200);
        assert_eq!(line.len, 0x200);
        assert_eq!(line.len_completed, None);
    }

    #[test]
    fn test_match_read_completion() {
        let line = op(&format!("read 17.5d5_head {} 0x0~16 = 22", OID));
        assert_eq!(line.op_type, OpType::Read);
        assert_eq!(line.len_completed, Some(22));
    }

    #[test]
    fn test_match_negative_result() {
        let line = op(&format!("read 17.5d5_head {} 0x0~1000 = -2", OID));
        assert_eq!(line.len_completed, Some(-2));
    }

    #[test]
    fn test_no_match_substeps() {
        assert!(OpLineMatcher.try_match(&format!("_do_write {} 0x0~1000 - have 0x0 (0) bytes fadvise_flags 0x0", OID)).is_none());
        assert!(OpLineMatcher.try_match("readdir something").is_none());
    }

    #[test]
    fn test_object_name_with_spaces() {
        let line = op("_write 17.5d5_head #17:aba88e4f:::my object:head# 0x0~200");
        assert_eq!(line.object_id.name, "my object");
        assert_eq!(line.offset, 0);
        assert_eq!(line.len, 0x200);
    }

    #[test]
    fn test_bad_object_id_is_decode_error() {
        let result = OpLineMatcher.try_match("read 17.5d5_head #17:zz:::x:head# 0x0~16").unwrap();
        assert!(matches!(result, Err(DecodeError::MalformedObjectId(_))));
    }
}
