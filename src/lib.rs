pub mod bbi;
pub mod config;
pub mod error;
pub mod file;
pub mod lookup;
pub mod stats;
pub mod stream;
pub mod types;

pub use config::{Config, RetryPolicy, StreamConfig};
pub use error::{Error, Result};
pub use file::SignalFile;
pub use stream::ByteStream;
pub use types::StatKind;
