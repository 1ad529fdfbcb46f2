//! Plain HTTP/1.1 ranged requests over a tokio TCP socket.

use super::framing::{ResponseHead, parse_response_head};
use super::remote::{RangeConnection, ReadinessSource, receive_ready};
use crate::config::RetryPolicy;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use std::io;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::{Host, Url};

const HEAD_CHUNK: usize = 4096;

pub(crate) struct PlainConnection {
    socket: TcpStream,
    /// Body bytes that arrived together with the response head
    pending: BytesMut,
}

#[async_trait]
impl ReadinessSource for TcpStream {
    async fn ready(&self) -> io::Result<()> {
        self.readable().await
    }

    fn try_receive(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.try_read(buf)
    }
}

impl PlainConnection {
    /// Open a socket and send `GET` with `Range: bytes=<start>-`.
    pub(crate) async fn connect(url: &Url, start: u64, policy: &RetryPolicy) -> Result<Self> {
        let port = url.port_or_known_default().unwrap_or(80);
        let connect = async {
            // IP literals connect directly; `host_str` would keep IPv6 brackets
            match url.host() {
                Some(Host::Ipv4(ip)) => TcpStream::connect((ip, port)).await,
                Some(Host::Ipv6(ip)) => TcpStream::connect((ip, port)).await,
                Some(Host::Domain(name)) => TcpStream::connect((name, port)).await,
                None => Err(io::Error::new(io::ErrorKind::InvalidInput, "missing host")),
            }
        };

        let mut socket = timeout(policy.readiness_timeout, connect)
            .await
            .map_err(|_| Error::Timeout(policy.readiness_timeout))?
            .map_err(|e| Error::Connection(format!("{}: {}", url, e)))?;

        socket
            .write_all(range_request(url, start).as_bytes())
            .await
            .map_err(|e| Error::Connection(format!("failed to send request to {}: {}", url, e)))?;

        Ok(Self {
            socket,
            pending: BytesMut::new(),
        })
    }
}

#[async_trait]
impl RangeConnection for PlainConnection {
    async fn read_head(&mut self, policy: &RetryPolicy) -> Result<ResponseHead> {
        let mut received = BytesMut::new();
        let mut chunk = [0u8; HEAD_CHUNK];

        loop {
            let n = receive_ready(&self.socket, &mut chunk, policy).await?;
            if n == 0 {
                return Err(Error::Connection(
                    "connection closed before the response head".to_string(),
                ));
            }
            received.extend_from_slice(&chunk[..n]);

            if let Some((head, body)) = parse_response_head(&received)? {
                if head
                    .header("transfer-encoding")
                    .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
                {
                    return Err(Error::Connection(
                        "chunked transfer encoding is not supported for range reads".to_string(),
                    ));
                }
                self.pending.extend_from_slice(body);
                return Ok(head);
            }
        }
    }

    async fn receive(&mut self, buf: &mut [u8], policy: &RetryPolicy) -> Result<usize> {
        if !self.pending.is_empty() {
            let n = self.pending.len().min(buf.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.advance(n);
            return Ok(n);
        }
        receive_ready(&self.socket, buf, policy).await
    }
}

fn range_request(url: &Url, start: u64) -> String {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nRange: bytes={}-\r\nAccept-Encoding: identity\r\nUser-Agent: bwstats/{}\r\nConnection: close\r\n\r\n",
        target,
        host,
        start,
        env!("CARGO_PKG_VERSION")
    )
}
