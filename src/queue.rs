use crate::node::NodeKind;
use crate::record::LogTable;

const ADDED_MARKER: &str = "Transaction added to Node";
const DUPLICATE_MARKER: &str = "Transaction already exists in queue for Node";

/// 時刻列と累積件数列（同じ長さ、累積は単調非減少）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CumulativeSeries {
    pub times: Vec<f64>,
    pub cumulative: Vec<u64>,
}

impl CumulativeSeries {
    fn push(&mut self, time: f64) {
        let next = self.cumulative.last().copied().unwrap_or(0) + 1;
        self.times.push(time);
        self.cumulative.push(next);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn last(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.times.iter().copied().zip(self.cumulative.iter().copied())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueGrowth {
    pub main: CumulativeSeries,
    pub player: CumulativeSeries,
}

impl QueueGrowth {
    pub fn series(&self, kind: NodeKind) -> &CumulativeSeries {
        match kind {
            NodeKind::Main => &self.main,
            NodeKind::Player => &self.player,
        }
    }

    fn series_mut(&mut self, kind: NodeKind) -> &mut CumulativeSeries {
        match kind {
            NodeKind::Main => &mut self.main,
            NodeKind::Player => &mut self.player,
        }
    }
}

/// Node ID of a queue message: the text after the "added" marker up to the
/// next `:`, or everything after the "already exists" marker.
pub fn queue_event_node(message: &str) -> Option<&str> {
    if let Some((_, rest)) = message.split_once(ADDED_MARKER) {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return Some(rest.split(':').next().unwrap_or_default());
    }
    if let Some((_, rest)) = message.split_once(DUPLICATE_MARKER) {
        return Some(rest.strip_prefix(' ').unwrap_or(rest));
    }
    None
}

/// 追加・重複検出メッセージを1件ずつ数え、ノード種別ごとの累積件数を作る
///
/// 重複検出もキューへの負荷として追加と同じカウンタに加算する。
pub fn analyze_transaction_queue(table: &LogTable) -> QueueGrowth {
    let mut growth = QueueGrowth::default();

    for entry in table.entries() {
        let Some(node) = queue_event_node(&entry.message) else {
            continue;
        };
        let kind = NodeKind::of(node);
        log::trace!("queue event at {}: {} node {}", entry.timestamp, kind, node);
        growth.series_mut(kind).push(entry.timestamp);
    }

    growth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;

    fn table(records: Vec<LogRecord>) -> LogTable {
        LogTable::from_records(records)
    }

    #[test]
    fn test_main_node_cumulative() {
        let growth = analyze_transaction_queue(&table(vec![
            LogRecord::new(1000.0, "Transaction added to Node 3: tx1"),
            LogRecord::new(1001.0, "Transaction added to Node 3: tx2"),
        ]));
        assert_eq!(growth.main.cumulative, vec![1, 2]);
        assert_eq!(growth.main.times, vec![1000.0, 1001.0]);
        assert!(growth.player.is_empty());
    }

    #[test]
    fn test_duplicates_are_additive() {
        let growth = analyze_transaction_queue(&table(vec![
            LogRecord::new(1000.0, "Transaction added to Node 1: 7"),
            LogRecord::new(1002.0, "Transaction already exists in queue for Node 1"),
            LogRecord::new(1001.0, "Node 1 started"),
        ]));
        assert_eq!(growth.main.cumulative, vec![1, 2]);
        assert_eq!(growth.main.last(), 2);
    }

    #[test]
    fn test_player_queue() {
        let key = "-----BEGIN PUBLIC KEY-----\nMFkwEwYH\n-----END PUBLIC KEY-----";
        let growth = analyze_transaction_queue(&table(vec![
            LogRecord::new(1.0, format!("Transaction added to Node {key}: 9")),
            LogRecord::new(2.0, format!("Transaction already exists in queue for Node {key}")),
            LogRecord::new(3.0, "Transaction added to Node 2: 9"),
        ]));
        assert_eq!(growth.series(NodeKind::Player).cumulative, vec![1, 2]);
        assert_eq!(growth.series(NodeKind::Main).cumulative, vec![1]);
    }

    #[test]
    fn test_cumulative_non_decreasing() {
        let records = (0..50)
            .map(|i| {
                let msg = if i % 3 == 0 {
                    format!("Transaction already exists in queue for Node {}", i % 4)
                } else {
                    format!("Transaction added to Node {}: {}", i % 4, i)
                };
                LogRecord::new(1000.0 + (i % 7) as f64, msg)
            })
            .collect();
        let growth = analyze_transaction_queue(&table(records));
        for series in [&growth.main, &growth.player] {
            assert_eq!(series.times.len(), series.cumulative.len());
            assert!(series.cumulative.windows(2).all(|w| w[0] <= w[1]));
            assert!(series.times.windows(2).all(|w| w[0] <= w[1]));
        }
        assert_eq!(growth.main.last(), 50);
    }

    #[test]
    fn test_queue_event_node() {
        assert_eq!(queue_event_node("Transaction added to Node 3: 12"), Some("3"));
        assert_eq!(
            queue_event_node("Transaction already exists in queue for Node 4"),
            Some("4")
        );
        assert_eq!(queue_event_node("Transaction added: xyz"), None);
    }
}
