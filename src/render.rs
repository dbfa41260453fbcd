use plotters::coord::Shift;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};

use crate::analysis::Analysis;
use crate::game::{MoveProgress, latest_per_game, move_progress};
use crate::mining::MiningActivity;
use crate::peak::PeakPeriods;
use crate::queue::{CumulativeSeries, QueueGrowth};
use crate::record::epoch_to_datetime;
use crate::timeline::CountSeries;

pub const NO_GAME_DATA: &str = "No game data available";
pub const NO_MOVE_DATA: &str = "No move data found";

const SYSTEM_LOAD_SIZE: (u32, u32) = (2000, 1600);
const MOVES_SIZE: (u32, u32) = (1200, 800);
const TITLE_FONT: (&str, u32) = ("sans-serif", 26);
const LABEL_MAX_CHARS: usize = 12;

const MAIN_COLOR: RGBColor = BLUE;
const PLAYER_COLOR: RGBColor = RGBColor(0, 150, 0);
const TOTAL_COLOR: RGBColor = RGBColor(128, 0, 128);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to draw {path}: {message}")]
    Draw { path: PathBuf, message: String },
    #[error("failed to create output directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    fn draw<E: std::fmt::Display>(path: &Path, err: E) -> Self {
        RenderError::Draw {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// パネルの中身。データが無ければ代わりに表示する文言を持つ
#[derive(Clone, Debug, PartialEq)]
pub enum Panel<T> {
    Data(T),
    Placeholder(&'static str),
}

impl<T> Panel<T> {
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Panel::Data(_) => None,
            Panel::Placeholder(text) => Some(*text),
        }
    }
}

/// Content of the six-panel system load figure.
pub struct SystemLoadLayout<'a> {
    pub queue: &'a QueueGrowth,
    pub peaks: &'a PeakPeriods,
    pub mining: &'a MiningActivity,
    /// 各ゲームの最新のチェーン長
    pub chain_sizes: Panel<Vec<(String, i64)>>,
    pub move_progress: Panel<Vec<MoveProgress>>,
}

impl<'a> SystemLoadLayout<'a> {
    pub fn new(analysis: &'a Analysis) -> Self {
        let (chain_sizes, progress) = if analysis.games.is_empty() {
            (
                Panel::Placeholder(NO_GAME_DATA),
                Panel::Placeholder(NO_GAME_DATA),
            )
        } else {
            let sizes = latest_per_game(&analysis.games)
                .into_iter()
                .map(|g| (g.game_id.clone(), g.chain_size))
                .collect();
            (Panel::Data(sizes), Panel::Data(move_progress(&analysis.games)))
        };

        Self {
            queue: &analysis.queue,
            peaks: &analysis.peaks,
            mining: &analysis.mining,
            chain_sizes,
            move_progress: progress,
        }
    }
}

/// Content of the move distribution figure.
pub struct MoveChartLayout {
    pub title: String,
    pub moves: Panel<Vec<(String, usize)>>,
}

impl MoveChartLayout {
    pub fn new(analysis: &Analysis) -> Self {
        let moves = if analysis.games.is_empty() {
            Panel::Placeholder(NO_GAME_DATA)
        } else if analysis.top_moves.is_empty() {
            Panel::Placeholder(NO_MOVE_DATA)
        } else {
            Panel::Data(analysis.top_moves.clone())
        };
        Self {
            title: format!("Top {} Chess Moves Distribution", analysis.move_limit),
            moves,
        }
    }
}

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

fn is_svg(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

fn ensure_parent_dir(path: &Path) -> Result<(), RenderError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

pub fn render_system_load(analysis: &Analysis, path: &Path) -> Result<(), RenderError> {
    let layout = SystemLoadLayout::new(analysis);
    ensure_parent_dir(path)?;

    if is_svg(path) {
        let root = SVGBackend::new(path, SYSTEM_LOAD_SIZE).into_drawing_area();
        draw_system_load(&root, &layout).map_err(|e| RenderError::draw(path, e))?;
        root.present().map_err(|e| RenderError::draw(path, e))?;
    } else {
        let root = BitMapBackend::new(path, SYSTEM_LOAD_SIZE).into_drawing_area();
        draw_system_load(&root, &layout).map_err(|e| RenderError::draw(path, e))?;
        root.present().map_err(|e| RenderError::draw(path, e))?;
    }
    log::info!("wrote {}", path.display());
    Ok(())
}

pub fn render_move_distribution(analysis: &Analysis, path: &Path) -> Result<(), RenderError> {
    let layout = MoveChartLayout::new(analysis);
    ensure_parent_dir(path)?;

    if is_svg(path) {
        let root = SVGBackend::new(path, MOVES_SIZE).into_drawing_area();
        draw_move_distribution(&root, &layout).map_err(|e| RenderError::draw(path, e))?;
        root.present().map_err(|e| RenderError::draw(path, e))?;
    } else {
        let root = BitMapBackend::new(path, MOVES_SIZE).into_drawing_area();
        draw_move_distribution(&root, &layout).map_err(|e| RenderError::draw(path, e))?;
        root.present().map_err(|e| RenderError::draw(path, e))?;
    }
    log::info!("wrote {}", path.display());
    Ok(())
}

/// 3x2 のグリッド。3段目のマイニングのみ横幅いっぱいに使う
pub fn draw_system_load<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    layout: &SystemLoadLayout<'_>,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let rows = root.split_evenly((3, 1));
    let top = rows[0].split_evenly((1, 2));
    let bottom = rows[2].split_evenly((1, 2));

    draw_queue_growth(&top[0], layout.queue)?;
    draw_peak_periods(&top[1], layout.peaks)?;
    draw_mining_activity(&rows[1], layout.mining)?;

    match &layout.chain_sizes {
        Panel::Data(sizes) => draw_bars(
            &bottom[0],
            "Final Chain Size by Game",
            "Game ID",
            "Chain Size",
            sizes,
        )?,
        Panel::Placeholder(text) => draw_placeholder(&bottom[0], "Final Chain Size by Game", text)?,
    }

    match &layout.move_progress {
        Panel::Data(progress) => draw_move_progress(&bottom[1], progress)?,
        Panel::Placeholder(text) => draw_placeholder(&bottom[1], "Move Count Progress by Game", text)?,
    }
    Ok(())
}

pub fn draw_move_distribution<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    layout: &MoveChartLayout,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let title = layout.title.as_str();
    match &layout.moves {
        Panel::Data(moves) => draw_bars(
            root,
            title,
            "Chess Move",
            "Frequency",
            &moves
                .iter()
                .map(|(mv, n)| (mv.clone(), i64::try_from(*n).unwrap_or(i64::MAX)))
                .collect::<Vec<_>>(),
        ),
        Panel::Placeholder(text) => draw_placeholder(root, title, text),
    }
}

fn format_time(secs: f64) -> String {
    epoch_to_datetime(secs)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LABEL_MAX_CHARS {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(LABEL_MAX_CHARS - 1).collect();
        short.push('…');
        short
    }
}

/// 表示する時間範囲。幅ゼロにならないよう最低1秒確保する
fn time_range<I: IntoIterator<Item = f64>>(times: I) -> std::ops::Range<f64> {
    let (min, max) = times
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if max - min < 1.0 {
        return (min - 0.5)..(max + 0.5);
    }
    min..max
}

fn count_ceiling(max: f64) -> f64 {
    if max.is_finite() && max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// 棒グラフの縦軸。負の値があれば0より下も含める
fn bar_range<I: IntoIterator<Item = i64>>(values: I) -> std::ops::Range<i64> {
    let (lo, hi) = values
        .into_iter()
        .fold((0i64, 0i64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let top = hi.saturating_add(hi / 10).max(1).saturating_add(1);
    let bottom = if lo < 0 {
        lo.saturating_add(lo / 10).saturating_sub(1)
    } else {
        0
    };
    bottom..top
}

fn count_points(series: &CountSeries) -> Vec<(f64, f64)> {
    series
        .bins()
        .iter()
        .map(|b| (b.start, b.count as f64))
        .collect()
}

fn cumulative_points(series: &CumulativeSeries) -> Vec<(f64, f64)> {
    series.points().map(|(t, n)| (t, n as f64)).collect()
}

fn legend_line(color: RGBColor) -> impl Fn((i32, i32)) -> PathElement<(i32, i32)> {
    move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color)
}

fn draw_queue_growth<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    queue: &QueueGrowth,
) -> DrawResult<DB> {
    let main = cumulative_points(&queue.main);
    let player = cumulative_points(&queue.player);
    let x_range = time_range(main.iter().chain(&player).map(|p| p.0));
    let y_max = count_ceiling(queue.main.last().max(queue.player.last()) as f64);

    let mut chart = ChartBuilder::on(area)
        .caption("Transaction Queue Growth Over Time by Node Type", TITLE_FONT.into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0f64..y_max)?;
    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Cumulative Transactions")
        .x_label_formatter(&|x| format_time(*x))
        .draw()?;

    if !main.is_empty() {
        chart
            .draw_series(LineSeries::new(main, MAIN_COLOR.stroke_width(2)).point_size(3))?
            .label("Main Nodes Queue")
            .legend(legend_line(MAIN_COLOR));
    }
    if !player.is_empty() {
        chart
            .draw_series(LineSeries::new(player, PLAYER_COLOR.stroke_width(2)).point_size(3))?
            .label("Player Nodes Queue")
            .legend(legend_line(PLAYER_COLOR));
    }
    if !queue.main.is_empty() || !queue.player.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

fn draw_peak_periods<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    peaks: &PeakPeriods,
) -> DrawResult<DB> {
    let total = count_points(&peaks.total);
    let main = count_points(&peaks.main);
    let player = count_points(&peaks.player);
    let x_range = time_range(total.iter().map(|p| p.0));
    let mut y_max = peaks.total.max_count() as f64;
    if peaks.threshold.is_finite() {
        y_max = y_max.max(peaks.threshold);
    }

    let mut chart = ChartBuilder::on(area)
        .caption("System Activity and Peak Processing Periods", TITLE_FONT.into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), 0f64..count_ceiling(y_max))?;
    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Events per Second")
        .x_label_formatter(&|x| format_time(*x))
        .draw()?;

    for (points, color, label) in [
        (total, TOTAL_COLOR, "Total Activity"),
        (main, MAIN_COLOR, "Main Node Activity"),
        (player, PLAYER_COLOR, "Player Node Activity"),
    ] {
        chart
            .draw_series(LineSeries::new(points, color.mix(0.6)))?
            .label(label)
            .legend(legend_line(color));
    }

    if !peaks.peaks.is_empty() {
        chart
            .draw_series(
                peaks
                    .peaks
                    .iter()
                    .map(|b| Circle::new((b.start, b.count as f64), 5, RED.filled())),
            )?
            .label("Peak Activity")
            .legend(|(x, y)| Circle::new((x + 10, y), 5, RED.filled()));
    }

    if peaks.threshold.is_finite() {
        let t = peaks.threshold;
        chart
            .draw_series(DashedLineSeries::new(
                vec![(x_range.start, t), (x_range.end, t)],
                10,
                6,
                RED.stroke_width(2),
            ))?
            .label(format!("Peak Threshold ({:.2})", t))
            .legend(legend_line(RED));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_mining_activity<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    mining: &MiningActivity,
) -> DrawResult<DB> {
    let main = count_points(&mining.main);
    let player = count_points(&mining.player);
    let x_range = time_range(main.iter().chain(&player).map(|p| p.0));
    let y_max = mining.main.max_count().max(mining.player.max_count()) as f64;

    let mut chart = ChartBuilder::on(area)
        .caption("Mining and Block Activity by Node Type", TITLE_FONT.into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0f64..count_ceiling(y_max))?;
    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Mining Events per Second")
        .x_label_formatter(&|x| format_time(*x))
        .draw()?;

    chart
        .draw_series(LineSeries::new(main, MAIN_COLOR.stroke_width(2)))?
        .label("Main Node Mining Activity")
        .legend(legend_line(MAIN_COLOR));
    chart
        .draw_series(LineSeries::new(player, PLAYER_COLOR.stroke_width(2)))?
        .label("Player Node Mining Activity")
        .legend(legend_line(PLAYER_COLOR));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_move_progress<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    progress: &[MoveProgress],
) -> DrawResult<DB> {
    let x_range = time_range(progress.iter().flat_map(|g| g.points.iter().map(|p| p.0)));
    let y_max = progress
        .iter()
        .flat_map(|g| g.points.iter().map(|p| p.1))
        .max()
        .unwrap_or(0) as f64;

    let mut chart = ChartBuilder::on(area)
        .caption("Move Count Progress by Game", TITLE_FONT.into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0f64..count_ceiling(y_max))?;
    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Number of Moves")
        .x_label_formatter(&|x| format_time(*x))
        .draw()?;

    for (i, game) in progress.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(
                LineSeries::new(
                    game.points.iter().map(|&(t, n)| (t, n as f64)),
                    color.stroke_width(2),
                )
                .point_size(3),
            )?
            .label(format!("Game {}", truncate_label(&game.game_id)))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    bars: &[(String, i64)],
) -> DrawResult<DB> {
    let labels: Vec<String> = bars.iter().map(|(l, _)| truncate_label(l)).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(title, TITLE_FONT.into_font())
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..bars.len()).into_segmented(),
            bar_range(bars.iter().map(|b| b.1)),
        )?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_labels(bars.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let color = Palette99::pick(i).mix(0.8);
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), *value)],
            color.filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        bar
    }))?;
    Ok(())
}

fn draw_placeholder<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    text: &str,
) -> DrawResult<DB> {
    let inner = area.titled(title, TITLE_FONT.into_font())?;
    let (w, h) = inner.dim_in_pixel();
    let style = TextStyle::from(("sans-serif", 24).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));
    inner.draw_text(text, &style, (w as i32 / 2, h as i32 / 2))?;
    Ok(())
}

/// Opens the written images with the platform's default viewer.
pub fn open_in_viewer(paths: &[&Path]) -> std::io::Result<()> {
    for path in paths {
        let mut command = if cfg!(target_os = "macos") {
            std::process::Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut c = std::process::Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            std::process::Command::new("xdg-open")
        };
        command.arg(path).spawn()?;
    }
    Ok(())
}
