use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use crate::record::LogTable;

/// 棋譜表記の指し手（駒の記号は省略可）
static CHESS_MOVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Move: ([KQRBNP]?[a-h][1-8])").expect("chess move pattern is valid")
});

/// `Winner ID: None` のときの勝者
pub const NO_WINNER: &str = "None";

/// One status line of a game as reported by a player node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameRecord {
    pub game_id: String,
    pub players: String,
    pub winner: String,
    #[serde(serialize_with = "yes_no")]
    pub complete: bool,
    pub chain_size: i64,
    pub move_count: usize,
    pub timestamp: f64,
}

impl GameRecord {
    pub fn complete_label(&self) -> &'static str {
        if self.complete { "Yes" } else { "No" }
    }
}

fn yes_no<S: serde::Serializer>(complete: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(if *complete { "Yes" } else { "No" })
}

/// `label` の直後から行末までを取り出して前後の空白を除く
fn field<'a>(message: &'a str, label: &str) -> Option<&'a str> {
    let (_, rest) = message.split_once(label)?;
    Some(rest.split('\n').next().unwrap_or_default().trim())
}

/// Parses a game status message, or `None` if any required field is missing
/// or the chain size is not an integer.
pub fn parse_game_record(message: &str, timestamp: f64) -> Option<GameRecord> {
    if !message.contains("Game ID:") || !message.contains("Players:") {
        return None;
    }

    let game_id = field(message, "Game ID:")?;
    let players = field(message, "Players:")?;
    let winner = if message.contains("Winner ID: None") {
        NO_WINNER
    } else {
        field(message, "Winner ID:")?
    };
    let complete = message.contains("Game Complete: Yes");
    let chain_size = field(message, "Chain Size:")?.parse::<i64>().ok()?;
    let move_count = message.matches("Move:").count();

    Some(GameRecord {
        game_id: game_id.to_string(),
        players: players.to_string(),
        winner: winner.to_string(),
        complete,
        chain_size,
        move_count,
        timestamp,
    })
}

/// ゲーム状態メッセージを時刻順に解析する。解析できない行は読み飛ばす
pub fn analyze_game_stats(table: &LogTable) -> Vec<GameRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for entry in table.containing("Game") {
        let message = &entry.message;
        if !message.contains("Game ID:") || !message.contains("Players:") {
            continue;
        }
        match parse_game_record(message, entry.timestamp) {
            Some(record) => records.push(record),
            None => {
                skipped += 1;
                log::debug!("skipping malformed game message at {}", entry.timestamp);
            }
        }
    }

    if skipped > 0 {
        log::info!("skipped {} malformed game messages", skipped);
    }
    records
}

/// Latest record of every game, ordered by that record's timestamp.
pub fn latest_per_game(records: &[GameRecord]) -> Vec<&GameRecord> {
    let mut latest: HashMap<&str, &GameRecord> = HashMap::new();
    for record in records {
        match latest.get(record.game_id.as_str()) {
            Some(prev) if prev.timestamp > record.timestamp => {}
            _ => {
                latest.insert(&record.game_id, record);
            }
        }
    }

    let mut out: Vec<&GameRecord> = latest.into_values().collect();
    out.sort_by(|a, b| {
        a.timestamp
            .total_cmp(&b.timestamp)
            .then_with(|| a.game_id.cmp(&b.game_id))
    });
    out
}

/// 1ゲームぶんの手数の推移
#[derive(Clone, Debug, PartialEq)]
pub struct MoveProgress {
    pub game_id: String,
    pub points: Vec<(f64, usize)>,
}

/// Move count over time for every game, ordered by game ID.
pub fn move_progress(records: &[GameRecord]) -> Vec<MoveProgress> {
    let mut sorted: Vec<&GameRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let mut games: BTreeMap<&str, Vec<(f64, usize)>> = BTreeMap::new();
    for record in sorted {
        games
            .entry(&record.game_id)
            .or_default()
            .push((record.timestamp, record.move_count));
    }
    games
        .into_iter()
        .map(|(game_id, points)| MoveProgress {
            game_id: game_id.to_string(),
            points,
        })
        .collect()
}

pub fn extract_chess_moves(message: &str) -> Vec<&str> {
    CHESS_MOVE
        .captures_iter(message)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Most frequent chess moves across all `Move:` messages, by count
/// descending then move ascending.
pub fn top_moves(table: &LogTable, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in table.containing("Move:") {
        for mv in extract_chess_moves(&entry.message) {
            *counts.entry(mv).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(mv, n)| (mv.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
