use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// ノードが書き出すログファイルのデフォルト名
pub const DEFAULT_LOG_FILE: &str = "logs.json";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read log file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("log file is not a JSON array of {{timestamp, message}} objects")]
    Json(#[from] serde_json::Error),
}

/// ログファイル中の1レコード
///
/// ```json
/// [
///   { "timestamp": 1718000000, "message": "Node 3 started" },
///   { "timestamp": 1718000001, "message": null }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// POSIX秒
    pub timestamp: f64,
    #[serde(default)]
    pub message: Option<String>,
}

impl LogRecord {
    pub fn new(timestamp: f64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: Some(message.into()),
        }
    }
}

/// Load every record of a JSON log file, in file order.
pub fn load_log_file<P: AsRef<Path>>(path: P) -> Result<Vec<LogRecord>, LoadError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_log_records(&content)
}

pub fn parse_log_records(content: &str) -> Result<Vec<LogRecord>, LoadError> {
    let records: Vec<LogRecord> = serde_json::from_str(content)?;
    Ok(records)
}

/// 正規化済みのログ行
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: f64,
    pub message: String,
    pub datetime: DateTime<Utc>,
}

/// Time-ordered table of log entries with a non-empty message.
#[derive(Debug, Clone, Default)]
pub struct LogTable {
    entries: Vec<LogEntry>,
    dropped: usize,
}

impl LogTable {
    pub fn from_records(records: Vec<LogRecord>) -> Self {
        let total = records.len();
        let mut entries = Vec::with_capacity(total);

        for record in records {
            let Some(message) = record.message.filter(|m| !m.is_empty()) else {
                continue;
            };
            let Some(datetime) = epoch_to_datetime(record.timestamp) else {
                log::warn!(
                    "dropping record with unusable timestamp {}",
                    record.timestamp
                );
                continue;
            };
            entries.push(LogEntry {
                timestamp: record.timestamp,
                message,
                datetime,
            });
        }

        // 同時刻の行はファイル順を保つ（安定ソート）
        entries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let dropped = total - entries.len();
        if dropped > 0 {
            log::info!("dropped {} of {} log records", dropped, total);
        }

        Self { entries, dropped }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 読み込み時に捨てたレコード数
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }

    /// Entries whose message contains `needle`.
    pub fn containing<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.message.contains(needle))
    }
}

pub fn epoch_to_datetime(timestamp: f64) -> Option<DateTime<Utc>> {
    if !timestamp.is_finite() {
        return None;
    }
    let secs = timestamp.floor();
    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return None;
    }
    let nanos = (((timestamp - secs) * 1e9).round() as u32).min(999_999_999);
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
}
