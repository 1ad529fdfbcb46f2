//! Seekable byte access to local files and remote resources.
//!
//! [`ByteStream`] hides the transport behind one `seek`/`read` interface:
//!
//! - local paths are read through the OS file API
//! - `http://` resources are fetched with raw HTTP/1.1 range requests over a
//!   tokio socket, buffered in a fixed-capacity window
//! - `https://` resources go through reqwest (feature `https`)
//! - `ftp://` is recognized but fails with [`Error::UnsupportedProtocol`]
//!
//! A handle is not shareable: every operation takes `&mut self`. Open one
//! handle per concurrent reader.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> bwstats::Result<()> {
//! use bwstats::config::StreamConfig;
//! use bwstats::stream::ByteStream;
//!
//! let mut stream = ByteStream::open("https://example.com/signal.bw", &StreamConfig::default()).await?;
//! stream.seek(64).await?;
//! let bytes = stream.read(24).await?;
//! # Ok(())
//! # }
//! ```

pub mod framing;
mod local;
mod plain;
mod remote;
#[cfg(feature = "https")]
mod tls;

use crate::config::StreamConfig;
use crate::error::zeroed_buffer;
use crate::types::TransportKind;
use crate::{Error, Result};
use bytes::Bytes;
use local::LocalStream;
use remote::RemoteStream;
use std::path::Path;
use url::Url;

enum Transport {
    Local(LocalStream),
    Remote(RemoteStream),
}

/// Seekable reader over one resource
pub struct ByteStream {
    descriptor: String,
    kind: TransportKind,
    transport: Transport,
}

impl ByteStream {
    /// Open `descriptor`, choosing the transport from its scheme prefix.
    pub async fn open(descriptor: &str, config: &StreamConfig) -> Result<Self> {
        let kind = TransportKind::from_descriptor(descriptor);

        let transport = match kind {
            TransportKind::Local => Transport::Local(LocalStream::open(Path::new(descriptor)).await?),
            TransportKind::Ftp => {
                return Err(Error::UnsupportedProtocol(format!(
                    "ftp ranged requests are not implemented: {}",
                    descriptor
                )));
            }
            TransportKind::Http | TransportKind::Https => {
                let url = Url::parse(descriptor)
                    .map_err(|e| Error::InvalidInput(format!("invalid URL {}: {}", descriptor, e)))?;
                Transport::Remote(RemoteStream::open(url, kind, config).await?)
            }
        };

        Ok(Self {
            descriptor: descriptor.to_string(),
            kind,
            transport,
        })
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Current cursor offset.
    pub fn position(&self) -> u64 {
        match &self.transport {
            Transport::Local(s) => s.position(),
            Transport::Remote(s) => s.position(),
        }
    }

    /// Total size of the resource, if known.
    ///
    /// Remote resources whose size was never reported stay `None` until the
    /// server closes the stream.
    pub fn resource_len(&self) -> Option<u64> {
        match &self.transport {
            Transport::Local(s) => Some(s.len()),
            Transport::Remote(s) => s.len(),
        }
    }

    pub async fn seek(&mut self, pos: u64) -> Result<()> {
        match &mut self.transport {
            Transport::Local(s) => s.seek(pos).await,
            Transport::Remote(s) => s.seek(pos).await,
        }
    }

    /// Fill `buf` from the cursor, advancing it. Fewer bytes is a short read.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match &mut self.transport {
            Transport::Local(s) => s.read_exact(buf).await,
            Transport::Remote(s) => s.read_exact(buf).await,
        }
    }

    /// Read exactly `n` bytes from the cursor.
    pub async fn read(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = zeroed_buffer(n)?;
        self.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    /// Seek to `offset` and read exactly `n` bytes.
    pub async fn read_at(&mut self, offset: u64, n: usize) -> Result<Bytes> {
        self.seek(offset).await?;
        self.read(n).await
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("descriptor", &self.descriptor)
            .field("kind", &self.kind)
            .field("position", &self.position())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_local_round_trip() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let descriptor = file.path().to_str().unwrap();
        let mut stream = ByteStream::open(descriptor, &StreamConfig::default())
            .await
            .unwrap();
        assert_eq!(stream.kind(), TransportKind::Local);
        assert_eq!(stream.resource_len(), Some(1000));

        for (pos, n) in [(0u64, 10usize), (995, 5), (500, 0), (123, 400)] {
            let bytes = stream.read_at(pos, n).await.unwrap();
            assert_eq!(&bytes[..], &data[pos as usize..pos as usize + n]);
        }
    }

    #[tokio::test]
    async fn test_ftp_is_unsupported() {
        let result = ByteStream::open("ftp://example.com/a.bw", &StreamConfig::default()).await;
        assert!(matches!(result, Err(Error::UnsupportedProtocol(_))));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = ByteStream::open("http://", &StreamConfig::default()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
