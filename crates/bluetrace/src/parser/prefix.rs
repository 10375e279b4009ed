//! Prefix: splits the daemon's fixed log prefix from the message body.
//!
//! `2020-07-04 12:39:19.590177 7f92be2ac700 10 osd.160 <message>`
//!
//! A single ISO-8601 token (`2020-07-04T12:39:19.590+0000`) is accepted as
//! the timestamp as well.

/// One log record with its prefix split out. Borrowed from the raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLine<'a> {
    /// Verbatim line without the trailing newline
    pub raw: &'a str,
    pub timestamp: &'a str,
    pub thread: &'a str,
    pub level: u8,
    pub logger: &'a str,
    /// Message body, left exactly as printed (double spaces are significant)
    pub message: &'a str,
}

/// Split the prefix of a raw log line. Returns `None` if the line does not
/// carry a timestamp, hex thread id, numeric level and logger name.
pub fn split_line(raw: &str) -> Option<LogLine<'_>> {
    let raw = raw.trim_end_matches(['\n', '\r']);

    let (timestamp, rest) = split_timestamp(raw)?;
    let (thread, rest) = rest.split_once(' ')?;
    let (level, rest) = rest.split_once(' ')?;
    // Message may be empty: "logger" with nothing after it
    let (logger, message) = rest.split_once(' ').unwrap_or((rest, ""));

    if thread.is_empty() || !thread.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if level.is_empty() || !level.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let level: u8 = level.parse().ok()?;
    if logger.is_empty() {
        return None;
    }

    Some(LogLine { raw, timestamp, thread, level, logger, message })
}

fn split_timestamp(raw: &str) -> Option<(&str, &str)> {
    let (first, rest) = raw.split_once(' ')?;
    if !looks_like_date(first) {
        return None;
    }

    // "YYYY-MM-DD HH:MM:SS.ffffff" spans two tokens; ISO-8601 spans one
    if first.contains('T') {
        return Some((first, rest));
    }

    let (time, after) = rest.split_once(' ')?;
    if time.is_empty() || !time.contains(':') || !time.bytes().all(|b| b.is_ascii_digit() || b == b':' || b == b'.') {
        return None;
    }
    let end = first.len() + 1 + time.len();
    Some((&raw[..end], after))
}

fn looks_like_date(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(|b| b.is_ascii_digit())
        && bytes[4] == b'-'
        && bytes[7] == b'-'
}
