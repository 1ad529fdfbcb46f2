use clap::{Args, Parser};
use std::time::Duration;

/// Retry and readiness policy for remote receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Receive attempts allowed while the transport keeps reporting "try again"
    pub max_attempts: u32,
    /// Sleep between attempts
    pub backoff: Duration,
    /// How long to wait for the socket to become readable
    pub readiness_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        StreamConfig::default().retry_policy()
    }
}

/// Byte stream tuning, shared by every transport.
#[derive(Debug, Clone, Args)]
pub struct StreamConfig {
    /// Capacity of the per-handle remote buffer in bytes
    #[arg(long, env = "BWSTATS_BUFFER_SIZE", default_value = "8192")]
    pub buffer_size: usize,

    /// Receive attempts before a remote read gives up
    #[arg(long, env = "BWSTATS_MAX_ATTEMPTS", default_value = "5")]
    pub max_attempts: u32,

    /// Milliseconds to sleep between receive attempts
    #[arg(long, env = "BWSTATS_BACKOFF_MS", default_value = "1000")]
    pub backoff_ms: u64,

    /// Seconds to wait for a socket to become readable
    #[arg(long, env = "BWSTATS_READINESS_TIMEOUT_SECS", default_value = "600")]
    pub readiness_timeout_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            max_attempts: 5,
            backoff_ms: 1000,
            readiness_timeout_secs: 600,
        }
    }
}

impl StreamConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
            readiness_timeout: Duration::from_secs(self.readiness_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bwstats")]
#[command(about = "Inspect a local or remote bigWig file")]
pub struct Config {
    /// Local path or http://, https:// URL of the file
    pub resource: String,

    /// Dump this many raw bytes (hex) starting at --offset
    #[arg(long)]
    pub length: Option<usize>,

    /// Byte offset for --length
    #[arg(long, default_value = "0")]
    pub offset: u64,

    /// Print the zoom level chosen for this many bases per bin
    #[arg(long)]
    pub bases_per_bin: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub stream: StreamConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(1));
        assert_eq!(policy.readiness_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let config = StreamConfig {
            max_attempts: 0,
            ..StreamConfig::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 1);
    }

    #[test]
    fn test_parse_defaults_match_default_impl() {
        let config = Config::parse_from(["bwstats", "test.bw"]);
        assert_eq!(config.resource, "test.bw");
        assert_eq!(config.offset, 0);
        assert!(config.length.is_none());
        let defaults = StreamConfig::default();
        assert_eq!(config.stream.buffer_size, defaults.buffer_size);
        assert_eq!(config.stream.max_attempts, defaults.max_attempts);
        assert_eq!(config.stream.backoff_ms, defaults.backoff_ms);
        assert_eq!(
            config.stream.readiness_timeout_secs,
            defaults.readiness_timeout_secs
        );
    }

    #[test]
    fn test_parse_overrides() {
        let config = Config::parse_from([
            "bwstats",
            "http://example.com/a.bw",
            "--buffer-size",
            "1024",
            "--backoff-ms",
            "5",
            "--length",
            "16",
            "--offset",
            "64",
        ]);
        assert_eq!(config.stream.buffer_size, 1024);
        assert_eq!(config.stream.retry_policy().backoff, Duration::from_millis(5));
        assert_eq!(config.length, Some(16));
        assert_eq!(config.offset, 64);
    }
}
