use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::record::{LogEntry, epoch_to_datetime};

/// 1系列あたりのビン数の上限
pub const MAX_BINS: usize = 5_000_000;

#[derive(Debug, Error, PartialEq)]
pub enum BinError {
    #[error("timestamp {timestamp} cannot be binned with a width of {bin_width}s")]
    OutOfRange { timestamp: f64, bin_width: f64 },
    #[error(
        "events from {first} to {last} need more than {max} bins of {bin_width}s",
        max = MAX_BINS
    )]
    TooManyBins { first: f64, last: f64, bin_width: f64 },
}

// i64 に収まらない、あるいは NaN になるビン番号はエラー
fn bin_index(timestamp: f64, bin_width: f64) -> Result<i64, BinError> {
    let index = (timestamp / bin_width).floor();
    if index.is_finite() && index >= i64::MIN as f64 && index < i64::MAX as f64 {
        Ok(index as i64)
    } else {
        Err(BinError::OutOfRange {
            timestamp,
            bin_width,
        })
    }
}

/// 1ビンぶんの集計結果
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bin {
    /// ビンの開始時刻（POSIX秒、ビン幅の倍数）
    pub start: f64,
    pub count: u64,
}

impl Bin {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        epoch_to_datetime(self.start)
    }
}

/// Event counts per fixed-width time bin.
///
/// Bins are aligned to multiples of the bin width since the epoch and cover
/// every bin from the first to the last observed event, so quiet bins are
/// present with a count of zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountSeries {
    bin_width: f64,
    bins: Vec<Bin>,
}

impl CountSeries {
    /// Bins the timestamps into `bin_width`-second bins.
    ///
    /// Fails when a bin index does not fit in `i64` or the span from the first
    /// to the last bin needs more than [`MAX_BINS`] bins.
    pub fn from_timestamps<I>(timestamps: I, bin_width: f64) -> Result<Self, BinError>
    where
        I: IntoIterator<Item = f64>,
    {
        let indices = timestamps
            .into_iter()
            .map(|ts| bin_index(ts, bin_width))
            .collect::<Result<Vec<i64>, _>>()?;

        let (Some(&first), Some(&last)) = (indices.iter().min(), indices.iter().max()) else {
            return Ok(Self {
                bin_width,
                bins: Vec::new(),
            });
        };

        let len = last
            .checked_sub(first)
            .and_then(|span| usize::try_from(span).ok())
            .and_then(|span| span.checked_add(1))
            .filter(|&len| len <= MAX_BINS)
            .ok_or(BinError::TooManyBins {
                first: first as f64 * bin_width,
                last: last as f64 * bin_width,
                bin_width,
            })?;

        let mut counts = vec![0u64; len];
        for index in indices {
            counts[(index - first) as usize] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(offset, count)| Bin {
                start: (first + offset as i64) as f64 * bin_width,
                count,
            })
            .collect();

        Ok(Self { bin_width, bins })
    }

    /// Bins the entries that satisfy `filter`.
    pub fn from_entries<'a, I, F>(entries: I, bin_width: f64, filter: F) -> Result<Self, BinError>
    where
        I: IntoIterator<Item = &'a LogEntry>,
        F: Fn(&LogEntry) -> bool,
    {
        Self::from_timestamps(
            entries
                .into_iter()
                .filter(|e| filter(e))
                .map(|e| e.timestamp),
            bin_width,
        )
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }

    /// 平均。ビンが無ければ NaN
    pub fn mean(&self) -> f64 {
        if self.bins.is_empty() {
            return f64::NAN;
        }
        self.total() as f64 / self.bins.len() as f64
    }

    /// 標本標準偏差 (n-1)。ビンが2つ未満なら NaN
    pub fn std_dev(&self) -> f64 {
        let n = self.bins.len();
        if n < 2 {
            return f64::NAN;
        }
        let mean = self.mean();
        let sum_sq: f64 = self
            .bins
            .iter()
            .map(|b| {
                let d = b.count as f64 - mean;
                d * d
            })
            .sum();
        (sum_sq / (n - 1) as f64).sqrt()
    }

    /// First and last bin start, if any.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        Some((self.bins.first()?.start, self.bins.last()?.start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_gaps_with_zero() {
        let series = CountSeries::from_timestamps([1000.2, 1000.9, 1003.0], 1.0).unwrap();
        let counts: Vec<_> = series.bins().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 0, 0, 1]);
        assert_eq!(series.bins()[0].start, 1000.0);
        assert_eq!(series.bins()[3].start, 1003.0);
        assert_eq!(series.total(), 3);
        assert_eq!(series.max_count(), 2);
        assert_eq!(series.time_span(), Some((1000.0, 1003.0)));
    }

    #[test]
    fn test_unsorted_input() {
        let series = CountSeries::from_timestamps([1002.0, 1000.0, 1002.5], 1.0).unwrap();
        let counts: Vec<_> = series.bins().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 2]);
    }

    #[test]
    fn test_wider_bins_align_to_epoch() {
        let series = CountSeries::from_timestamps([1001.0, 1004.0, 1006.0], 5.0).unwrap();
        assert_eq!(series.bins()[0].start, 1000.0);
        let counts: Vec<_> = series.bins().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1]);
    }

    #[test]
    fn test_empty_series_statistics() {
        let series = CountSeries::from_timestamps(std::iter::empty(), 1.0).unwrap();
        assert!(series.is_empty());
        assert!(series.mean().is_nan());
        assert!(series.std_dev().is_nan());
        assert_eq!(series.time_span(), None);
    }

    #[test]
    fn test_sample_std_dev() {
        // counts: 1, 3 -> mean 2, sample std sqrt(2)
        let series = CountSeries::from_timestamps([10.0, 11.0, 11.1, 11.2], 1.0).unwrap();
        assert_eq!(series.mean(), 2.0);
        assert!((series.std_dev() - 2f64.sqrt()).abs() < 1e-12);

        let single = CountSeries::from_timestamps([10.0, 10.5], 1.0).unwrap();
        assert_eq!(single.mean(), 2.0);
        assert!(single.std_dev().is_nan());
    }

    #[test]
    fn test_huge_span_is_an_error() {
        let err = CountSeries::from_timestamps([-1.0e12, 1.0e12], 1.0e-8).unwrap_err();
        assert!(matches!(err, BinError::OutOfRange { .. } | BinError::TooManyBins { .. }));

        // a stray zero timestamp among current ones spans ~1.7e9 one-second bins
        let err = CountSeries::from_timestamps([0.0, 1.7e9, 1.7e9 + 1.0], 1.0).unwrap_err();
        assert!(matches!(err, BinError::TooManyBins { .. }));
    }

    #[test]
    fn test_index_outside_i64_is_an_error() {
        let err = CountSeries::from_timestamps([1.0e30], 1.0e-8).unwrap_err();
        assert_eq!(
            err,
            BinError::OutOfRange {
                timestamp: 1.0e30,
                bin_width: 1.0e-8
            }
        );
    }

    #[test]
    fn test_span_just_over_the_limit() {
        let err = CountSeries::from_timestamps([0.0, MAX_BINS as f64], 1.0).unwrap_err();
        assert_eq!(
            err,
            BinError::TooManyBins {
                first: 0.0,
                last: MAX_BINS as f64,
                bin_width: 1.0
            }
        );
        // the same span fits with a wider bin
        let series = CountSeries::from_timestamps([0.0, MAX_BINS as f64], 1000.0).unwrap();
        assert_eq!(series.len(), MAX_BINS / 1000 + 1);
    }
}
