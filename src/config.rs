use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::node::DEFAULT_NODE_EXCLUSIONS;
use crate::record::DEFAULT_LOG_FILE;

pub const DEFAULT_SYSTEM_LOAD_OUTPUT: &str = "system_load_analysis.png";
pub const DEFAULT_MOVES_OUTPUT: &str = "chess_moves_distribution.png";
pub const DEFAULT_TOP_MOVES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON")]
    Json(#[from] serde_json::Error),
    #[error("bin width must be a positive number of seconds, got {0}")]
    BinWidth(f64),
    #[error("top move count must be at least 1")]
    TopMoves,
}

/// 解析の設定
///
/// # Usage Example
///
/// ```json
/// {
///   "input": "logs.json",
///   "system_load_output": "out/system_load_analysis.png",
///   "moves_output": "out/chess_moves_distribution.svg",
///   "bin_width_secs": 1.0,
///   "display": false,
///   "node_exclusions": ["already", "with", "started", "and"],
///   "top_moves": 20,
///   "csv_output": "games.csv"
/// }
/// ```
///
/// Omitted fields take their defaults. A `.svg` output path selects the SVG
/// backend, anything else is written as a bitmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Log file to analyze.
    pub input: PathBuf,
    /// ノード負荷の6パネル図
    pub system_load_output: PathBuf,
    /// 指し手分布の図
    pub moves_output: PathBuf,
    /// Width of a time bin in seconds.
    pub bin_width_secs: f64,
    /// Open both images with the platform viewer after writing them.
    pub display: bool,
    /// `"Node "` の後に来てもノードIDとみなさない単語
    pub node_exclusions: Vec<String>,
    pub top_moves: usize,
    /// ゲーム記録のCSV出力先
    pub csv_output: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_LOG_FILE),
            system_load_output: PathBuf::from(DEFAULT_SYSTEM_LOAD_OUTPUT),
            moves_output: PathBuf::from(DEFAULT_MOVES_OUTPUT),
            bin_width_secs: 1.0,
            display: false,
            node_exclusions: DEFAULT_NODE_EXCLUSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            top_moves: DEFAULT_TOP_MOVES,
            csv_output: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load config from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AnalyzerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bin_width_secs.is_finite() || self.bin_width_secs <= 0.0 {
            return Err(ConfigError::BinWidth(self.bin_width_secs));
        }
        if self.top_moves == 0 {
            return Err(ConfigError::TopMoves);
        }
        Ok(())
    }

    pub fn exclusions(&self) -> Vec<&str> {
        self.node_exclusions.iter().map(String::as_str).collect()
    }
}
