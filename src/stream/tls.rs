//! HTTPS ranged requests through reqwest.
//!
//! reqwest owns the TLS session and the response framing, so the head is
//! assembled from its parsed status and headers and the body arrives as
//! chunks that we hand out in buffer-sized pieces.
//!
//! reqwest awaits body chunks itself, so there is no "try again" to retry
//! here: a chunk that does not arrive within the readiness timeout is
//! [`Error::Timeout`], and this transport never yields `TransientIo`.

use super::framing::ResponseHead;
use super::remote::RangeConnection;
use crate::config::RetryPolicy;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use tokio::time::timeout;
use url::Url;

pub(crate) struct TlsConnection {
    response: Response,
    pending: PendingChunk,
}

impl TlsConnection {
    pub(crate) async fn connect(
        client: &Client,
        url: &Url,
        start: u64,
        policy: &RetryPolicy,
    ) -> Result<Self> {
        let request = client
            .get(url.clone())
            .header(reqwest::header::RANGE, format!("bytes={}-", start))
            .header(reqwest::header::ACCEPT_ENCODING, "identity");

        let response = timeout(policy.readiness_timeout, request.send())
            .await
            .map_err(|_| Error::Timeout(policy.readiness_timeout))?
            .map_err(|e| Error::Connection(format!("HTTPS request to {} failed: {}", url, e)))?;

        Ok(Self {
            response,
            pending: PendingChunk::default(),
        })
    }
}

/// Build a [`ResponseHead`] from a response reqwest has already parsed.
///
/// Headers that are not valid text are dropped. `content_length` is the body
/// size reqwest reports, which takes precedence in `resource_len`.
pub(crate) fn head_from_parts(
    status: u16,
    headers: &HeaderMap,
    content_length: Option<u64>,
) -> ResponseHead {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();

    ResponseHead {
        status,
        header_len: 0,
        reported_len: content_length,
        headers,
    }
}

/// Remainder of the last body chunk not yet handed out
#[derive(Debug, Default)]
pub(crate) struct PendingChunk {
    bytes: Bytes,
}

impl PendingChunk {
    pub(crate) fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn refill(&mut self, chunk: Bytes) {
        self.bytes = chunk;
    }

    /// Copy as much as fits into `buf`, returning the count.
    pub(crate) fn take_into(&mut self, buf: &mut [u8]) -> usize {
        let n = self.bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&self.bytes[..n]);
        self.bytes.advance(n);
        n
    }
}

#[async_trait]
impl RangeConnection for TlsConnection {
    async fn read_head(&mut self, _policy: &RetryPolicy) -> Result<ResponseHead> {
        Ok(head_from_parts(
            self.response.status().as_u16(),
            self.response.headers(),
            self.response.content_length(),
        ))
    }

    async fn receive(&mut self, buf: &mut [u8], policy: &RetryPolicy) -> Result<usize> {
        // empty chunks are skipped rather than read as end of stream
        while self.pending.is_empty() {
            let chunk = timeout(policy.readiness_timeout, self.response.chunk())
                .await
                .map_err(|_| Error::Timeout(policy.readiness_timeout))?
                .map_err(|e| Error::Connection(format!("HTTPS body read failed: {}", e)))?;
            match chunk {
                Some(bytes) => self.pending.refill(bytes),
                None => return Ok(0),
            }
        }
        Ok(self.pending.take_into(buf))
    }
}
