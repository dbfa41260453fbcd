use crate::node::is_player_node;
use crate::record::{LogEntry, LogTable};
use crate::timeline::{BinError, CountSeries};

/// マイニング・ブロック関連とみなすキーワード
pub const MINING_KEYWORDS: &[&str] = &["Mining", "mined by Node", "Block"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MiningActivity {
    pub main: CountSeries,
    pub player: CountSeries,
}

pub fn is_mining_message(message: &str) -> bool {
    MINING_KEYWORDS.iter().any(|k| message.contains(k))
}

/// Per-bin mining and block events, split by node kind.
pub fn analyze_mining_activity(
    table: &LogTable,
    bin_width: f64,
) -> Result<MiningActivity, BinError> {
    let mining: Vec<&LogEntry> = table
        .entries()
        .iter()
        .filter(|e| is_mining_message(&e.message))
        .collect();

    let main = CountSeries::from_entries(mining.iter().copied(), bin_width, |e| {
        !is_player_node(&e.message)
    })?;
    let player = CountSeries::from_entries(mining.iter().copied(), bin_width, |e| {
        is_player_node(&e.message)
    })?;

    Ok(MiningActivity { main, player })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;

    #[test]
    fn test_mining_filter() {
        assert!(is_mining_message("Mining Main block with 3 transactions by Node 1"));
        assert!(is_mining_message("Valid block mined by Node 2: 00ab"));
        assert!(is_mining_message("Block already in blockchain, hash: 00ab, from Node 3"));
        assert!(!is_mining_message("Transaction added to Node 1: 4"));
        // 小文字の "block" だけでは対象外
        assert!(!is_mining_message("Received block from NULL peer."));
    }

    #[test]
    fn test_split_by_node_kind() {
        let records = vec![
            LogRecord::new(10.0, "Mining Main block with 2 transactions by Node 1"),
            LogRecord::new(10.4, "Valid block mined by Node 1: 00f1"),
            LogRecord::new(12.0, "Mining block...-----END PUBLIC KEY----- transactions in queue"),
            LogRecord::new(12.5, "Node 4 started"),
        ];
        let activity = analyze_mining_activity(&LogTable::from_records(records), 1.0).unwrap();
        let main: Vec<_> = activity.main.bins().iter().map(|b| b.count).collect();
        assert_eq!(main, vec![2]);
        assert_eq!(activity.player.total(), 1);
        assert_eq!(activity.player.bins()[0].start, 12.0);
    }

    #[test]
    fn test_empty() {
        let activity = analyze_mining_activity(&LogTable::default(), 1.0).unwrap();
        assert!(activity.main.is_empty());
        assert!(activity.player.is_empty());
    }

    #[test]
    fn test_out_of_range_timestamp_is_an_error() {
        let records = vec![
            LogRecord::new(-1.0e12, "Mining Main block with 1 transactions by Node 1"),
            LogRecord::new(1.0e12, "Valid block mined by Node 1: 00f1"),
        ];
        let table = LogTable::from_records(records);
        assert!(analyze_mining_activity(&table, 1.0e-8).is_err());
    }
}
