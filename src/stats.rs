//! Per-bin statistics from zoom summaries or raw intervals.
//!
//! The summary path computes the variance from stored sums with the
//! uncentered formula; the raw path centers on the mean first. The two give
//! different results on the same data and must stay separate.
//!
//! # Empty bins
//!
//! A bin with no data yields `NaN` for mean, stdev, max and min, and `0` for
//! coverage. `NaN` never encodes an error.

use crate::types::{Bin, Interval, StatKind, SummaryRecord};
use crate::error::try_vec;
use crate::{Error, Result};

/// Split `[start, end)` into `n_bins` bins of equal width; the last bin takes
/// the remainder so the bins tile the region exactly.
pub fn bins(start: u32, end: u32, n_bins: u32) -> Result<Vec<Bin>> {
    if n_bins == 0 {
        return Err(Error::Domain("number of bins must be positive".to_string()));
    }
    if end <= start {
        return Err(Error::Domain(format!("empty region [{}, {})", start, end)));
    }
    let width = (end - start) / n_bins;
    if width == 0 {
        return Err(Error::Domain(format!(
            "region [{}, {}) is narrower than {} bins",
            start, end, n_bins
        )));
    }

    let mut bins = try_vec(n_bins as usize)?;
    bins.extend((0..n_bins).map(|i| {
        let bin_start = start + i * width;
        let bin_end = if i == n_bins - 1 { end } else { bin_start + width };
        Bin {
            start: bin_start,
            end: bin_end,
        }
    }));
    Ok(bins)
}

/// Bases per bin used to pick a zoom level for the whole query (rounded up).
pub fn requested_bases_per_bin(start: u32, end: u32, n_bins: u32) -> u32 {
    (end - start).div_ceil(n_bins)
}

/// Running merge of zoom-level summary records for one bin
#[derive(Debug, Clone, Copy)]
pub struct SummaryAccumulator {
    records: usize,
    covered_bases: u64,
    sum: f64,
    sum_squares: f64,
    min: f64,
    max: f64,
}

impl Default for SummaryAccumulator {
    fn default() -> Self {
        Self {
            records: 0,
            covered_bases: 0,
            sum: 0.0,
            sum_squares: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &SummaryRecord) {
        self.records += 1;
        self.covered_bases += u64::from(record.covered_bases);
        self.sum += f64::from(record.sum);
        self.sum_squares += f64::from(record.sum_squares);
        self.min = self.min.min(f64::from(record.min));
        self.max = self.max.max(f64::from(record.max));
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn covered_bases(&self) -> u64 {
        self.covered_bases
    }

    /// Value of `kind` over everything pushed so far.
    ///
    /// Coverage is the number of covered bases, not a fraction; divide by the
    /// bin width to normalize.
    pub fn statistic(&self, kind: StatKind) -> f64 {
        if self.records == 0 {
            return match kind {
                StatKind::Coverage => 0.0,
                _ => f64::NAN,
            };
        }

        let n = self.covered_bases as f64;
        match kind {
            StatKind::Mean if self.covered_bases == 0 => f64::NAN,
            StatKind::Mean => self.sum / n,
            StatKind::Stdev if self.covered_bases < 2 => f64::NAN,
            // uncentered form; loses precision for large n
            StatKind::Stdev => ((self.sum_squares - self.sum * self.sum / n) / (n - 1.0)).sqrt(),
            StatKind::Max => self.max,
            StatKind::Min => self.min,
            StatKind::Coverage => n,
        }
    }
}

/// Merge summary records into one value.
pub fn summary_statistic(records: &[SummaryRecord], kind: StatKind) -> f64 {
    let mut acc = SummaryAccumulator::new();
    for record in records {
        acc.push(record);
    }
    acc.statistic(kind)
}

/// Compute `kind` over raw intervals clipped to `bin`.
///
/// Intervals that do not reach into the bin are ignored. Mean and stdev are
/// weighted by clipped length and divided by the covered length, not the bin
/// width; max and min are not weighted; coverage is the covered fraction of
/// the bin.
pub fn interval_statistic(intervals: &[Interval], bin: Bin, kind: StatKind) -> f64 {
    let covered = || {
        intervals.iter().filter_map(move |iv| match iv.clipped_len(bin) {
            0 => None,
            len => Some((f64::from(len), f64::from(iv.value))),
        })
    };

    let n: f64 = covered().map(|(len, _)| len).sum();
    if n == 0.0 {
        return match kind {
            StatKind::Coverage => 0.0,
            _ => f64::NAN,
        };
    }

    match kind {
        StatKind::Mean => weighted_mean(covered()),
        StatKind::Stdev if n < 2.0 => f64::NAN,
        StatKind::Stdev => {
            let mean = weighted_mean(covered());
            let (s1, s2) = covered().fold((0.0, 0.0), |(s1, s2), (len, value)| {
                let delta = value - mean;
                (s1 + len * delta, s2 + len * delta * delta)
            });
            ((s2 - s1 * s1 / n) / (n - 1.0)).sqrt()
        }
        StatKind::Max => covered().map(|(_, v)| v).fold(f64::NEG_INFINITY, f64::max),
        StatKind::Min => covered().map(|(_, v)| v).fold(f64::INFINITY, f64::min),
        StatKind::Coverage => n / f64::from(bin.width()),
    }
}

fn weighted_mean(values: impl Iterator<Item = (f64, f64)>) -> f64 {
    let (sum, n) = values.fold((0.0, 0.0), |(sum, n), (len, value)| (sum + len * value, n + len));
    sum / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(covered_bases: u32, sum: f32, sum_squares: f32, min: f32, max: f32) -> SummaryRecord {
        SummaryRecord {
            covered_bases,
            min,
            max,
            sum,
            sum_squares,
        }
    }

    const BIN: Bin = Bin { start: 0, end: 100 };

    #[test]
    fn test_bins_tile_region() {
        let bins = bins(100, 207, 5).unwrap();
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0], Bin { start: 100, end: 121 });
        assert_eq!(bins[3], Bin { start: 163, end: 184 });
        assert_eq!(bins[4], Bin { start: 184, end: 207 });
        for pair in bins.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_bins_domain_errors() {
        assert!(matches!(bins(0, 100, 0), Err(Error::Domain(_))));
        assert!(matches!(bins(100, 100, 1), Err(Error::Domain(_))));
        assert!(matches!(bins(100, 50, 1), Err(Error::Domain(_))));
        assert!(matches!(bins(0, 5, 10), Err(Error::Domain(_))));
    }

    #[test]
    fn test_requested_bases_per_bin_rounds_up() {
        assert_eq!(requested_bases_per_bin(0, 100, 10), 10);
        assert_eq!(requested_bases_per_bin(0, 101, 10), 11);
    }

    #[test]
    fn test_summary_mean() {
        let records = [summary(10, 20.0, 0.0, 0.0, 0.0), summary(5, 5.0, 0.0, 0.0, 0.0)];
        let mean = summary_statistic(&records, StatKind::Mean);
        assert!((mean - 25.0 / 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_stdev_uncentered_formula() {
        // values 1,2,3,4 covered once each
        let records = [summary(2, 3.0, 5.0, 1.0, 2.0), summary(2, 7.0, 25.0, 3.0, 4.0)];
        let expected = ((30.0f64 - 100.0 / 4.0) / 3.0).sqrt();
        assert!((summary_statistic(&records, StatKind::Stdev) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_summary_stdev_needs_two_bases() {
        let records = [summary(1, 3.0, 9.0, 3.0, 3.0)];
        assert!(summary_statistic(&records, StatKind::Stdev).is_nan());
        let records = [summary(0, 0.0, 0.0, 0.0, 0.0)];
        assert!(summary_statistic(&records, StatKind::Stdev).is_nan());
        assert!(summary_statistic(&records, StatKind::Mean).is_nan());
    }

    #[test]
    fn test_summary_min_max_fold_fields() {
        let records = [
            summary(5, 0.0, 0.0, -2.0, 3.0),
            summary(5, 0.0, 0.0, 1.0, 9.0),
            summary(5, 0.0, 0.0, -4.0, -1.0),
        ];
        assert_eq!(summary_statistic(&records, StatKind::Max), 9.0);
        assert_eq!(summary_statistic(&records, StatKind::Min), -4.0);
    }

    #[test]
    fn test_summary_coverage_is_base_count() {
        let records = [summary(10, 0.0, 0.0, 0.0, 0.0), summary(5, 0.0, 0.0, 0.0, 0.0)];
        assert_eq!(summary_statistic(&records, StatKind::Coverage), 15.0);
    }

    #[test]
    fn test_summary_empty() {
        assert!(summary_statistic(&[], StatKind::Mean).is_nan());
        assert!(summary_statistic(&[], StatKind::Stdev).is_nan());
        assert!(summary_statistic(&[], StatKind::Max).is_nan());
        assert!(summary_statistic(&[], StatKind::Min).is_nan());
        assert_eq!(summary_statistic(&[], StatKind::Coverage), 0.0);
    }

    #[test]
    fn test_interval_mean_divides_by_covered_length() {
        let intervals = [Interval::new(10, 60, 5.0)];
        assert_eq!(interval_statistic(&intervals, BIN, StatKind::Mean), 5.0);
    }

    #[test]
    fn test_interval_mean_clips_to_bin() {
        let intervals = [Interval::new(0, 150, 2.0), Interval::new(50, 100, 4.0)];
        let bin = Bin { start: 0, end: 100 };
        // 100 bases at 2.0 plus 50 bases at 4.0
        let expected = (100.0 * 2.0 + 50.0 * 4.0) / 150.0;
        assert!((interval_statistic(&intervals, bin, StatKind::Mean) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_interval_full_cover() {
        let intervals = [Interval::new(0, 100, 7.5)];
        assert_eq!(interval_statistic(&intervals, BIN, StatKind::Mean), 7.5);
        assert_eq!(interval_statistic(&intervals, BIN, StatKind::Coverage), 1.0);
        assert_eq!(interval_statistic(&intervals, BIN, StatKind::Stdev), 0.0);
    }

    #[test]
    fn test_interval_stdev_centered() {
        let intervals = [Interval::new(0, 2, 1.0), Interval::new(2, 4, 3.0)];
        let bin = Bin { start: 0, end: 4 };
        // values 1,1,3,3: sample variance 4/3
        let expected = (4.0f64 / 3.0).sqrt();
        assert!((interval_statistic(&intervals, bin, StatKind::Stdev) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_interval_stdev_single_base() {
        let intervals = [Interval::new(99, 150, 3.0)];
        let value = interval_statistic(&intervals, BIN, StatKind::Stdev);
        assert!(value.is_nan());
        assert!(!value.is_infinite());
    }

    #[test]
    fn test_interval_min_max_unweighted() {
        let intervals = [
            Interval::new(0, 90, 1.0),
            Interval::new(90, 91, 10.0),
            Interval::new(91, 100, -3.0),
            Interval::new(200, 300, 99.0),
        ];
        assert_eq!(interval_statistic(&intervals, BIN, StatKind::Max), 10.0);
        assert_eq!(interval_statistic(&intervals, BIN, StatKind::Min), -3.0);
    }

    #[test]
    fn test_interval_partial_coverage() {
        let intervals = [Interval::new(10, 60, 5.0), Interval::new(80, 120, 1.0)];
        assert_eq!(interval_statistic(&intervals, BIN, StatKind::Coverage), 0.7);
    }

    #[test]
    fn test_interval_empty() {
        let outside = [Interval::new(100, 200, 1.0)];
        for intervals in [&[][..], &outside[..]] {
            assert!(interval_statistic(intervals, BIN, StatKind::Mean).is_nan());
            assert!(interval_statistic(intervals, BIN, StatKind::Stdev).is_nan());
            assert!(interval_statistic(intervals, BIN, StatKind::Max).is_nan());
            assert!(interval_statistic(intervals, BIN, StatKind::Min).is_nan());
            assert_eq!(interval_statistic(intervals, BIN, StatKind::Coverage), 0.0);
        }
    }
}
