//! Buffered reader over a ranged-request connection.
//!
//! A [`RemoteStream`] keeps one fixed-capacity buffer holding the window
//! `[window_start, window_start + filled)` of the resource. Seeks inside the
//! window only move the cursor; seeks outside it drop the connection and issue
//! a fresh range request starting at the target offset.

use super::framing::ResponseHead;
use super::plain::PlainConnection;
use crate::config::{RetryPolicy, StreamConfig};
use crate::error::zeroed_buffer;
use crate::types::TransportKind;
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::{self, ErrorKind};
use tokio::time::{sleep, timeout};
use url::Url;

/// One in-flight ranged response
#[async_trait]
pub(crate) trait RangeConnection: Send {
    /// Receive and strip the response framing.
    async fn read_head(&mut self, policy: &RetryPolicy) -> Result<ResponseHead>;

    /// Receive body bytes into `buf`. `Ok(0)` means the peer closed the stream.
    async fn receive(&mut self, buf: &mut [u8], policy: &RetryPolicy) -> Result<usize>;
}

/// A socket-like source that can be waited on and then read without blocking
#[async_trait]
pub(crate) trait ReadinessSource: Sync {
    async fn ready(&self) -> io::Result<()>;

    fn try_receive(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Wait for readiness, then receive, retrying "try again" under `policy`.
pub(crate) async fn receive_ready<S>(source: &S, buf: &mut [u8], policy: &RetryPolicy) -> Result<usize>
where
    S: ReadinessSource + ?Sized,
{
    let mut attempts = 0;
    loop {
        match timeout(policy.readiness_timeout, source.ready()).await {
            Err(_) => return Err(Error::Timeout(policy.readiness_timeout)),
            Ok(Err(e)) => return Err(Error::Io(e)),
            Ok(Ok(())) => {}
        }

        match source.try_receive(buf) {
            Ok(n) => return Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                attempts += 1;
                if attempts >= policy.max_attempts {
                    return Err(Error::TransientIo { attempts });
                }
                tracing::warn!(attempts, backoff = ?policy.backoff, "receive not ready, retrying");
                sleep(policy.backoff).await;
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

enum Connector {
    Plain,
    #[cfg(feature = "https")]
    Tls(reqwest::Client),
}

impl Connector {
    fn for_kind(kind: TransportKind, policy: &RetryPolicy) -> Result<Self> {
        match kind {
            TransportKind::Http => Ok(Connector::Plain),
            #[cfg(feature = "https")]
            TransportKind::Https => {
                let client = reqwest::Client::builder()
                    .connect_timeout(policy.readiness_timeout)
                    .build()
                    .map_err(|e| Error::Connection(format!("failed to create HTTPS client: {}", e)))?;
                Ok(Connector::Tls(client))
            }
            #[cfg(not(feature = "https"))]
            TransportKind::Https => {
                let _ = policy;
                Err(Error::UnsupportedProtocol(
                    "https (built without the `https` feature)".to_string(),
                ))
            }
            // rejected by `ByteStream::open` before a connector is built
            TransportKind::Local | TransportKind::Ftp => Err(Error::Internal(format!(
                "{:?} resource routed to a range transport",
                kind
            ))),
        }
    }

    async fn connect(
        &self,
        url: &Url,
        start: u64,
        policy: &RetryPolicy,
    ) -> Result<Box<dyn RangeConnection>> {
        match self {
            Connector::Plain => Ok(Box::new(PlainConnection::connect(url, start, policy).await?)),
            #[cfg(feature = "https")]
            Connector::Tls(client) => Ok(Box::new(
                super::tls::TlsConnection::connect(client, url, start, policy).await?,
            )),
        }
    }
}

pub(crate) struct RemoteStream {
    url: Url,
    connector: Connector,
    policy: RetryPolicy,
    conn: Box<dyn RangeConnection>,
    head_seen: bool,
    exhausted: bool,
    buffer: Vec<u8>,
    window_start: u64,
    filled: usize,
    position: u64,
    len: Option<u64>,
}

impl RemoteStream {
    /// Connect and issue the first range request at offset 0.
    pub(crate) async fn open(url: Url, kind: TransportKind, config: &StreamConfig) -> Result<Self> {
        let policy = config.retry_policy();
        let connector = Connector::for_kind(kind, &policy)?;
        let buffer = zeroed_buffer(config.buffer_size.max(1))?;
        let conn = connector.connect(&url, 0, &policy).await?;

        let mut stream = Self {
            url,
            connector,
            policy,
            conn,
            head_seen: false,
            exhausted: false,
            buffer,
            window_start: 0,
            filled: 0,
            position: 0,
            len: None,
        };
        stream.fill().await?;

        tracing::debug!(url = %stream.url, len = ?stream.len, "opened remote resource");
        Ok(stream)
    }

    pub(crate) fn len(&self) -> Option<u64> {
        self.len
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    fn window_end(&self) -> u64 {
        self.window_start + self.filled as u64
    }

    pub(crate) async fn seek(&mut self, pos: u64) -> Result<()> {
        if pos >= self.window_start && pos <= self.window_end() {
            tracing::trace!(pos, "seek inside buffered window");
            self.position = pos;
            return Ok(());
        }
        self.request(pos).await
    }

    /// Drop the current window and connection, then issue a range request at `pos`.
    async fn request(&mut self, pos: u64) -> Result<()> {
        tracing::debug!(url = %self.url, pos, "issuing range request");
        self.conn = self.connector.connect(&self.url, pos, &self.policy).await?;
        self.head_seen = false;
        self.exhausted = false;
        self.window_start = pos;
        self.filled = 0;
        self.position = pos;
        Ok(())
    }

    async fn ensure_head(&mut self) -> Result<()> {
        if self.head_seen {
            return Ok(());
        }
        let head = self.conn.read_head(&self.policy).await?;
        tracing::debug!(status = head.status, header_len = head.header_len, "response head");

        match head.status {
            206 => {}
            200 if self.window_start == 0 => {}
            200 => {
                return Err(Error::Connection(format!(
                    "{} ignored the range request for offset {}",
                    self.url, self.window_start
                )));
            }
            416 => {
                // nothing at or after this offset; only a reported total says where the end is
                self.exhausted = true;
                if let Some(total) = head.content_range_total() {
                    self.len = Some(total);
                }
            }
            status => {
                return Err(Error::Connection(format!(
                    "unexpected HTTP status {} from {}",
                    status, self.url
                )));
            }
        }

        if !self.exhausted {
            if let Some(len) = head.resource_len(self.window_start) {
                self.len = Some(len);
            }
        }
        self.head_seen = true;
        Ok(())
    }

    /// Replace the window with the next bytes from the connection.
    async fn fill(&mut self) -> Result<usize> {
        self.window_start += self.filled as u64;
        self.filled = 0;

        self.ensure_head().await?;
        if self.exhausted {
            return Ok(0);
        }

        let n = self.conn.receive(&mut self.buffer, &self.policy).await?;
        if n == 0 {
            self.exhausted = true;
            // length unknown until the server closes the stream
            if self.len.is_none() {
                self.len = Some(self.window_start);
            }
        }
        self.filled = n;
        tracing::trace!(window_start = self.window_start, filled = n, "buffer filled");
        Ok(n)
    }

    pub(crate) async fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let wanted = out.len();
        let start = self.position;
        if let Some(len) = self.len {
            if start + wanted as u64 > len {
                return Err(Error::ShortRead {
                    offset: start,
                    wanted,
                    got: len.saturating_sub(start) as usize,
                });
            }
        }

        let mut copied = 0;
        while copied < wanted {
            let offset = (self.position - self.window_start) as usize;
            if offset < self.filled {
                let n = (self.filled - offset).min(wanted - copied);
                out[copied..copied + n].copy_from_slice(&self.buffer[offset..offset + n]);
                copied += n;
                self.position += n as u64;
                continue;
            }
            if self.fill().await? == 0 {
                return Err(Error::ShortRead {
                    offset: start,
                    wanted,
                    got: copied,
                });
            }
        }
        Ok(())
    }
}
