use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// How the bytes of a resource are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Local,
    Http,
    Https,
    Ftp,
}

impl TransportKind {
    /// Classify a resource descriptor by its scheme prefix.
    /// Anything without a recognized scheme is a local path.
    pub fn from_descriptor(descriptor: &str) -> Self {
        if descriptor.starts_with("http://") {
            TransportKind::Http
        } else if descriptor.starts_with("https://") {
            TransportKind::Https
        } else if descriptor.starts_with("ftp://") {
            TransportKind::Ftp
        } else {
            TransportKind::Local
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, TransportKind::Local)
    }
}

/// Statistic produced for each bin of a windowed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    #[default]
    Mean,
    Stdev,
    Max,
    Min,
    Coverage,
}

impl StatKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatKind::Mean => "mean",
            StatKind::Stdev => "stdev",
            StatKind::Max => "max",
            StatKind::Min => "min",
            StatKind::Coverage => "coverage",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(StatKind::Mean),
            "stdev" | "std" => Ok(StatKind::Stdev),
            "max" => Ok(StatKind::Max),
            "min" => Ok(StatKind::Min),
            "coverage" | "cov" => Ok(StatKind::Coverage),
            _ => Err(Error::InvalidInput(format!("unknown statistic: {}", s))),
        }
    }
}

/// Aggregate over a sub-range, as stored in a zoom-level block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryRecord {
    pub covered_bases: u32,
    pub min: f32,
    pub max: f32,
    pub sum: f32,
    pub sum_squares: f32,
}

/// Location of one stored record, as reported by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapBlock {
    pub offset: u64,
    pub size: u32,
}

/// One stored data interval, half-open `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
    pub value: f32,
}

impl Interval {
    pub fn new(start: u32, end: u32, value: f32) -> Self {
        Self { start, end, value }
    }

    /// Number of bases this interval shares with `bin`.
    pub fn clipped_len(&self, bin: Bin) -> u32 {
        let start = self.start.max(bin.start);
        let end = self.end.min(bin.end);
        end.saturating_sub(start)
    }
}

/// One sub-interval of a query region, half-open `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bin {
    pub start: u32,
    pub end: u32,
}

impl Bin {
    pub fn width(&self) -> u32 {
        self.end - self.start
    }
}
