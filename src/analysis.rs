use crate::game::{GameRecord, analyze_game_stats, latest_per_game, top_moves};
use crate::mining::{MiningActivity, analyze_mining_activity};
use crate::node::{NodeIds, NodeKind, extract_node_ids};
use crate::peak::{PeakPeriods, identify_peak_periods};
use crate::queue::{QueueGrowth, analyze_transaction_queue};
use crate::record::{LogTable, epoch_to_datetime};
use crate::timeline::BinError;

/// 解析パラメータ
#[derive(Clone, Debug)]
pub struct AnalysisOptions<'a> {
    pub bin_width: f64,
    pub node_exclusions: &'a [&'a str],
    pub top_moves: usize,
}

/// Output of every analyzer pass over one log table.
#[derive(Clone, Debug, Default)]
pub struct Analysis {
    pub nodes: NodeIds,
    pub queue: QueueGrowth,
    pub peaks: PeakPeriods,
    pub mining: MiningActivity,
    pub games: Vec<GameRecord>,
    /// 出現回数の多い指し手。ゲーム記録が無いときは空
    pub top_moves: Vec<(String, usize)>,
    pub move_limit: usize,
    /// 正規化で読み飛ばしたレコード数
    pub dropped: usize,
}

impl Analysis {
    /// Runs every pass. Fails only when the timestamps cannot be binned with
    /// `options.bin_width`.
    pub fn run(table: &LogTable, options: &AnalysisOptions<'_>) -> Result<Self, BinError> {
        let nodes = extract_node_ids(table.messages(), options.node_exclusions);
        let queue = analyze_transaction_queue(table);
        let peaks = identify_peak_periods(table, options.bin_width)?;
        let mining = analyze_mining_activity(table, options.bin_width)?;
        let games = analyze_game_stats(table);
        let top_moves = if games.is_empty() {
            Vec::new()
        } else {
            top_moves(table, options.top_moves)
        };

        Ok(Self {
            nodes,
            queue,
            peaks,
            mining,
            games,
            top_moves,
            move_limit: options.top_moves,
            dropped: table.dropped(),
        })
    }

    pub fn log_summary(&self) {
        log::info!("Analysis Summary:");
        if self.dropped > 0 {
            log::info!("- Skipped records: {}", self.dropped);
        }
        log::info!(
            "- Nodes: {} main, {} player",
            self.nodes.main.len(),
            self.nodes.player.len()
        );
        for kind in [NodeKind::Main, NodeKind::Player] {
            log::info!("- Queue events ({}): {}", kind, self.queue.series(kind).last());
        }
        log::info!(
            "- Activity: {} events over {} bins of {}s, peak threshold {:.2}, {} peak bins",
            self.peaks.total.total(),
            self.peaks.total.len(),
            self.peaks.total.bin_width(),
            self.peaks.threshold,
            self.peaks.peaks.len()
        );
        if let Some((first, last)) = self.peaks.total.time_span() {
            log::info!("- Time span: {} to {}", format_epoch(first), format_epoch(last));
        }
        if let Some(busiest) = self.peaks.peaks.iter().max_by_key(|b| b.count) {
            log::info!(
                "- Busiest bin: {} events at {}",
                busiest.count,
                busiest
                    .datetime()
                    .map_or_else(|| busiest.start.to_string(), |dt| dt.to_rfc3339())
            );
        }
        log::info!(
            "- Mining events: {} main, {} player",
            self.mining.main.total(),
            self.mining.player.total()
        );

        let latest = latest_per_game(&self.games);
        let completed = latest.iter().filter(|g| g.complete).count();
        log::info!(
            "- Games: {} status records, {} games, {} complete",
            self.games.len(),
            latest.len(),
            completed
        );
        if let Some((mv, n)) = self.top_moves.first() {
            log::info!("- Most frequent move: {} ({} times)", mv, n);
        }
    }
}

fn format_epoch(ts: f64) -> String {
    epoch_to_datetime(ts).map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
}
