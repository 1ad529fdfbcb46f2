//! HTTP/1.1 response framing for ranged GET requests.
//!
//! The plain-HTTP transport receives the status line and headers in the same
//! byte stream as the body. [`parse_response_head`] splits the two: it returns
//! the parsed head (including its length in bytes) and the body bytes that
//! arrived with it, or `None` while the head is still incomplete.

use crate::{Error, Result};

/// Upper bound on the size of a response head before we give up on the peer.
pub const MAX_HEAD_LEN: usize = 64 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Status line and headers of a ranged response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    /// Bytes occupied by the status line, headers and blank line
    pub header_len: usize,
    /// Body size reported by the protocol layer itself, when it has one
    pub reported_len: Option<u64>,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `Content-Length` header, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// Total resource size from `Content-Range: bytes a-b/total` (or `bytes */total`).
    pub fn content_range_total(&self) -> Option<u64> {
        let value = self.header("content-range")?;
        let (_, total) = value.trim().rsplit_once('/')?;
        total.trim().parse().ok()
    }

    /// Length of the whole resource given that this response starts at `start`.
    ///
    /// The protocol-reported body size wins; otherwise the header text is
    /// scanned for a range total and then for a plain content length.
    pub fn resource_len(&self, start: u64) -> Option<u64> {
        if let Some(len) = self.reported_len {
            return Some(start + len);
        }
        if let Some(total) = self.content_range_total() {
            return Some(total);
        }
        self.content_length().map(|len| start + len)
    }
}

/// Split a response buffer into its head and the body bytes that follow it.
///
/// Returns `Ok(None)` if the blank line ending the head has not arrived yet.
pub fn parse_response_head(buf: &[u8]) -> Result<Option<(ResponseHead, &[u8])>> {
    let Some(pos) = find_terminator(buf) else {
        if buf.len() > MAX_HEAD_LEN {
            return Err(Error::Connection(format!(
                "response head exceeds {} bytes",
                MAX_HEAD_LEN
            )));
        }
        return Ok(None);
    };

    let header_len = pos + HEAD_TERMINATOR.len();
    let text = std::str::from_utf8(&buf[..pos])
        .map_err(|_| Error::Connection("response head is not valid text".to_string()))?;

    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = parse_status_line(status_line)?;

    let headers = lines
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    let head = ResponseHead {
        status,
        header_len,
        reported_len: None,
        headers,
    };
    Ok(Some((head, &buf[header_len..])))
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
}

fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(Error::Connection(format!("bad status line: {:?}", line)));
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::Connection(format!("bad status line: {:?}", line)))
}
