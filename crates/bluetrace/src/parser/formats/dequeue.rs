use std::sync::LazyLock;
use regex::Regex;

use crate::parser::model::{DequeueDetails, DequeueLine, DequeueStage};
use crate::parser::primitives::parse_dec;
use crate::parser::traits::*;

// 771412 dequeue_op 0x55c7a60a12c0 prio 63 cost 4096 latency 0.001706 osd_op(...) v8 pg pg[...]
// 771412 dequeue_op 0x55c7a60a12c0 finish
static DEQUEUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\d+ )?dequeue_op (?P<op_id>\S+) (?P<stage>finish|prio)(?: (?P<prio>\d+) cost (?P<cost>\d+) latency (?P<latency>[\d.]+) (?P<op_data>.*))?",
    )
    .expect("dequeue pattern is valid")
});

/// Lifecycle boundary: `prio` opens an operation lifecycle, `finish` closes it.
pub struct DequeueMatcher;

impl LineMatcher for DequeueMatcher {
    fn try_match(&self, body: &str) -> Option<Result<LineMatch, DecodeError>> {
        if !body.contains("dequeue_op ") {
            return None;
        }
        let caps = DEQUEUE_RE.captures(body)?;

        let stage = match &caps["stage"] {
            "prio" => DequeueStage::Prio,
            _ => DequeueStage::Finish,
        };

        // Bad queueing details never cost the boundary itself
        let (details, details_error) = match (caps.name("prio"), caps.name("cost"), caps.name("latency")) {
            (Some(prio), Some(cost), Some(latency)) => {
                match decode_details(prio.as_str(), cost.as_str(), latency.as_str(), &caps) {
                    Ok(details) => (Some(details), None),
                    Err(e) => (None, Some(e)),
                }
            }
            _ => (None, None),
        };

        Some(Ok(LineMatch::Dequeue(DequeueLine {
            op_id: caps["op_id"].to_string(),
            stage,
            details,
            details_error,
        })))
    }

    fn shape(&self) -> LineShape {
        LineShape::Dequeue
    }
}

fn decode_details(
    prio: &str,
    cost: &str,
    latency: &str,
    caps: &regex::Captures<'_>,
) -> Result<DequeueDetails, DecodeError> {
    let priority = u32::try_from(parse_dec(prio)?)
        .map_err(|_| DecodeError::MalformedNumber(format!("priority out of range: {}", prio)))?;
    let latency: f64 = latency
        .parse()
        .map_err(|_| DecodeError::MalformedNumber(format!("bad latency: {:?}", latency)))?;

    Ok(DequeueDetails {
        priority,
        cost: parse_dec(cost)?,
        latency,
        op_data: caps.name("op_data").map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}
