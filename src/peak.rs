use crate::node::is_player_node;
use crate::record::LogTable;
use crate::timeline::{Bin, BinError, CountSeries};

/// 秒あたりイベント数とピーク区間
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeakPeriods {
    pub total: CountSeries,
    pub main: CountSeries,
    pub player: CountSeries,
    /// `threshold` を厳密に超えたビン
    pub peaks: Vec<Bin>,
    /// mean + std。ビンが2つ未満なら NaN
    pub threshold: f64,
}

pub fn peak_threshold(series: &CountSeries) -> f64 {
    series.mean() + series.std_dev()
}

/// Bins every message, then flags bins whose total count strictly exceeds
/// the mean plus one sample standard deviation.
pub fn identify_peak_periods(
    table: &LogTable,
    bin_width: f64,
) -> Result<PeakPeriods, BinError> {
    let entries = table.entries();
    let total = CountSeries::from_entries(entries, bin_width, |_| true)?;
    let main = CountSeries::from_entries(entries, bin_width, |e| !is_player_node(&e.message))?;
    let player = CountSeries::from_entries(entries, bin_width, |e| is_player_node(&e.message))?;

    let threshold = peak_threshold(&total);
    // NaN との比較は常に false なので、データ不足時はピーク無しになる
    let peaks = total
        .bins()
        .iter()
        .filter(|b| b.count as f64 > threshold)
        .copied()
        .collect();

    Ok(PeakPeriods {
        total,
        main,
        player,
        peaks,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;

    fn records_at(times: &[f64]) -> Vec<LogRecord> {
        times
            .iter()
            .map(|&t| LogRecord::new(t, "Node 1 heartbeat"))
            .collect()
    }

    #[test]
    fn test_flags_bins_above_threshold() {
        // counts per second: 1, 1, 1, 5
        let mut times = vec![100.0, 101.0, 102.0];
        times.extend([103.0, 103.1, 103.2, 103.3, 103.4]);
        let table = LogTable::from_records(records_at(&times));
        let peaks = identify_peak_periods(&table, 1.0).unwrap();

        let counts = [1.0f64, 1.0, 1.0, 5.0];
        let mean = counts.iter().sum::<f64>() / 4.0;
        let var = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / 3.0;
        assert!((peaks.threshold - (mean + var.sqrt())).abs() < 1e-12);

        assert_eq!(peaks.peaks.len(), 1);
        assert_eq!(peaks.peaks[0].start, 103.0);
        assert_eq!(peaks.peaks[0].count, 5);
    }

    #[test]
    fn test_strictly_greater() {
        // counts 1, 1, 1 -> threshold is exactly 1 and no bin exceeds it
        let peaks = identify_peak_periods(
            &LogTable::from_records(records_at(&[10.0, 11.0, 12.0])),
            1.0,
        )
        .unwrap();
        assert_eq!(peaks.threshold, 1.0);
        assert!(peaks.peaks.is_empty());
    }

    #[test]
    fn test_main_and_player_split() {
        let records = vec![
            LogRecord::new(1.0, "Node 1 started"),
            LogRecord::new(1.5, "Game started by -----END PUBLIC KEY-----"),
            LogRecord::new(2.0, "Mining block...-----END PUBLIC KEY----- transactions in queue"),
        ];
        let peaks = identify_peak_periods(&LogTable::from_records(records), 1.0).unwrap();
        assert_eq!(peaks.total.total(), 3);
        assert_eq!(peaks.main.total(), 1);
        assert_eq!(peaks.player.total(), 2);
        assert_eq!(peaks.main.len(), 1);
        assert_eq!(peaks.player.len(), 2);
    }

    #[test]
    fn test_empty_table() {
        let peaks = identify_peak_periods(&LogTable::default(), 1.0).unwrap();
        assert!(peaks.total.is_empty());
        assert!(peaks.main.is_empty());
        assert!(peaks.player.is_empty());
        assert!(peaks.threshold.is_nan());
        assert!(peaks.peaks.is_empty());
    }

    #[test]
    fn test_single_bin_has_no_peaks() {
        let peaks = identify_peak_periods(&LogTable::from_records(records_at(&[5.0, 5.2, 5.4])), 1.0)
            .unwrap();
        assert_eq!(peaks.total.len(), 1);
        assert!(peaks.threshold.is_nan());
        assert!(peaks.peaks.is_empty());
    }

    #[test]
    fn test_stray_timestamp_is_an_error() {
        // 1970 年のレコードが1件混ざると数十億ビンになる
        let table = LogTable::from_records(records_at(&[0.0, 1.7e9, 1.7e9 + 1.0]));
        let err = identify_peak_periods(&table, 1.0).unwrap_err();
        assert!(matches!(err, BinError::TooManyBins { .. }));
        // 幅を広げれば集計できる
        assert!(identify_peak_periods(&table, 1.0e6).is_ok());
    }
}
