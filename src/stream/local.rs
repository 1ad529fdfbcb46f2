use crate::{Error, Result};
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// A local file read through the OS, with no buffering of our own
pub(crate) struct LocalStream {
    file: File,
    path: PathBuf,
    len: u64,
    position: u64,
}

impl LocalStream {
    pub(crate) async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .await
            .map_err(|e| Error::Connection(format!("couldn't open {}: {}", path.display(), e)))?;
        let len = file.metadata().await?.len();

        tracing::debug!(path = %path.display(), len, "opened local file");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
            position: 0,
        })
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) async fn seek(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos)).await.map_err(|e| {
            Error::Connection(format!("couldn't seek {} to {}: {}", self.path.display(), pos, e))
        })?;
        self.position = pos;
        Ok(())
    }

    /// Fill `out` completely; anything less is a short read.
    pub(crate) async fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let wanted = out.len();
        let available = self.len.saturating_sub(self.position);
        if (wanted as u64) > available {
            return Err(Error::ShortRead {
                offset: self.position,
                wanted,
                got: available as usize,
            });
        }

        match self.file.read_exact(out).await {
            Ok(_) => {
                self.position += wanted as u64;
                Ok(())
            }
            // the file shrank underneath us
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::ShortRead {
                offset: self.position,
                wanted,
                got: 0,
            }),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
