use anyhow::Context;
use chainlog_analyzer::analysis::{Analysis, AnalysisOptions};
use chainlog_analyzer::config::AnalyzerConfig;
use chainlog_analyzer::export::export_game_records;
use chainlog_analyzer::record::{LogTable, load_log_file};
use chainlog_analyzer::render::{open_in_viewer, render_move_distribution, render_system_load};
use clap::Parser;
use std::path::PathBuf;

/// ノードのログ(JSON)から負荷とゲーム統計のグラフを作る
#[derive(Parser, Debug, Clone)]
struct Cli {
    /// Log file to analyze [default: logs.json]
    #[clap(short, long)]
    input: Option<PathBuf>,
    /// System load figure [default: system_load_analysis.png]
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Chess move distribution figure [default: chess_moves_distribution.png]
    #[clap(short, long)]
    moves_output: Option<PathBuf>,
    /// Time bin width in seconds [default: 1]
    #[clap(short, long)]
    bin_width: Option<f64>,
    /// JSON config file; command line flags take precedence
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Write the parsed game records to this CSV file
    #[clap(long)]
    csv: Option<PathBuf>,
    /// Open both images after writing them
    #[clap(long)]
    show: bool,
    /// Log the summary without drawing any charts
    #[clap(long)]
    summary_only: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AnalyzerConfig::default(),
        };
        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.system_load_output = output;
        }
        if let Some(moves_output) = self.moves_output {
            config.moves_output = moves_output;
        }
        if let Some(bin_width) = self.bin_width {
            config.bin_width_secs = bin_width;
        }
        if let Some(csv) = self.csv {
            config.csv_output = Some(csv);
        }
        config.display |= self.show;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();
    let summary_only = args.summary_only;
    let config = args.into_config()?;
    log::info!(
        "input: {}, bin width: {}s, outputs: {} / {}",
        config.input.display(),
        config.bin_width_secs,
        config.system_load_output.display(),
        config.moves_output.display()
    );

    let records = load_log_file(&config.input)
        .with_context(|| format!("loading logs from {}", config.input.display()))?;
    let table = LogTable::from_records(records);
    log::info!("{} log entries", table.len());

    let exclusions = config.exclusions();
    let analysis = Analysis::run(
        &table,
        &AnalysisOptions {
            bin_width: config.bin_width_secs,
            node_exclusions: &exclusions,
            top_moves: config.top_moves,
        },
    )
    .context("binning log timestamps; try a wider --bin-width")?;
    analysis.log_summary();

    if let Some(path) = &config.csv_output {
        export_game_records(path, &analysis.games)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {} game records to {}", analysis.games.len(), path.display());
    }

    if summary_only {
        return Ok(());
    }

    render_system_load(&analysis, &config.system_load_output)?;
    render_move_distribution(&analysis, &config.moves_output)?;

    if config.display {
        let paths = [config.system_load_output.as_path(), config.moves_output.as_path()];
        if let Err(e) = open_in_viewer(&paths) {
            log::warn!("could not open images: {}", e);
        }
    }
    Ok(())
}
