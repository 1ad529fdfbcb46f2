use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("socket not ready within {0:?}")]
    Timeout(Duration),

    #[error("receive still not ready after {attempts} attempts")]
    TransientIo { attempts: u32 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    ShortRead { offset: u64, wanted: usize, got: usize },

    #[error("decompression failed: {0}")]
    Decode(String),

    #[error("invalid format: {0}")]
    Format(String),

    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    #[error("invalid bins: {0}")]
    Domain(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable name of the error class, used in logs and by the binary.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Timeout(_) => "TimeoutError",
            Error::TransientIo { .. } => "TransientIOError",
            Error::Connection(_) => "ConnectionError",
            Error::UnsupportedProtocol(_) => "UnsupportedProtocol",
            Error::ShortRead { .. } => "ShortReadError",
            Error::Decode(_) => "DecodeError",
            Error::Format(_) => "FormatError",
            Error::OutOfMemory(_) => "OutOfMemory",
            Error::Domain(_) => "DomainError",
            Error::NotFound(_) => "NotFound",
            Error::InvalidInput(_) => "InvalidInput",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }
}

/// Empty vector with room for `len` items, reporting allocation failure
/// instead of aborting.
pub(crate) fn try_vec<T>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory(len.saturating_mul(std::mem::size_of::<T>())))?;
    Ok(buf)
}

/// Allocate a zeroed scratch buffer.
pub(crate) fn zeroed_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buf = try_vec(len)?;
    buf.resize(len, 0);
    Ok(buf)
}
