pub mod analysis;
pub mod config;
pub mod export;
pub mod game;
pub mod mining;
pub mod node;
pub mod peak;
pub mod queue;
pub mod record;
pub mod render;
pub mod timeline;

pub use analysis::{Analysis, AnalysisOptions};
pub use config::{AnalyzerConfig, ConfigError};
pub use game::GameRecord;
pub use node::{NodeId, NodeIds, NodeKind};
pub use record::{LoadError, LogEntry, LogRecord, LogTable, load_log_file};
pub use render::{RenderError, render_move_distribution, render_system_load};
pub use timeline::{BinError, CountSeries};
